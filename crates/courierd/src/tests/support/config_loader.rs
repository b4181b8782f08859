//! Configuration loaders covering the success and failure paths.

use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;

use courier_config::{Config, SocketEndpoint};
use ortho_config::{OrthoConfig, OrthoError};
use tempfile::TempDir;

use crate::bootstrap::ConfigLoader;

/// Loader that places the daemon socket under a temporary directory.
pub struct TestConfigLoader {
    socket_dir: TempDir,
}

impl TestConfigLoader {
    pub fn new() -> Self {
        Self {
            socket_dir: TempDir::new().expect("failed to create temporary directory for socket"),
        }
    }

    /// Path of the socket the loaded configuration points at.
    pub fn socket_path(&self) -> PathBuf {
        self.socket_dir.path().join("courierd.sock")
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let path = self.socket_path();
        let path = path
            .to_str()
            .expect("temporary socket path was not valid UTF-8");
        Ok(Config {
            daemon_socket: SocketEndpoint::unix(path),
            ..Config::default()
        })
    }
}

/// Loader that fails by passing an unparsable socket on the command line.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("courierd"),
            OsString::from("--daemon-socket"),
            OsString::from("invalid://socket"),
        ];
        Config::load_from_iter(args)
    }
}
