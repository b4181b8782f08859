//! Daemon bootstrap orchestration.

use std::io;
use std::sync::Arc;

use courier_config::{Config, SocketPreparationError};
use courier_core::DispatchOptions;
use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;
use tokio::runtime::{Handle, Runtime};

use crate::app::{App, AppError, Authenticator};
use crate::dispatch::RpcConnectionHandler;
use crate::health::HealthReporter;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
    ///
    /// # Errors
    ///
    /// Returns the loader's error when no valid configuration can be built.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that returns a fixed configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps an already resolved configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// Socket preparation failed.
    #[error("failed to prepare daemon socket: {source}")]
    Socket {
        /// Filesystem error reported while preparing the socket directory.
        #[source]
        source: SocketPreparationError,
    },
    /// The application routers could not be assembled.
    #[error("failed to build application: {source}")]
    Application {
        /// Underlying router error.
        #[source]
        source: AppError,
    },
    /// The async runtime could not be started.
    #[error("failed to start async runtime: {source}")]
    Runtime {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

impl BootstrapError {
    /// Names the bootstrap step that failed.
    #[must_use]
    pub const fn stage(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "configuration",
            Self::Telemetry { .. } => "telemetry",
            Self::Socket { .. } => "socket",
            Self::Application { .. } => "application",
            Self::Runtime { .. } => "runtime",
        }
    }
}

/// A bootstrapped daemon, ready to be attached to a listener.
pub struct Daemon {
    config: Config,
    app: Arc<App>,
    runtime: Runtime,
    telemetry: TelemetryHandle,
}

impl Daemon {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Accessor for the application.
    #[must_use]
    pub fn app(&self) -> &App {
        &self.app
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Returns a handle to the runtime that resolves calls.
    #[must_use]
    pub fn runtime(&self) -> Handle {
        self.runtime.handle().clone()
    }

    /// Builds a connection handler serving this daemon's application.
    #[must_use]
    pub fn connection_handler(&self) -> RpcConnectionHandler {
        RpcConnectionHandler::new(Arc::clone(&self.app), self.runtime())
    }
}

impl std::fmt::Debug for Daemon {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Daemon")
            .field("config", &self.config)
            .field("app", &self.app)
            .finish_non_exhaustive()
    }
}

/// Bootstraps the daemon using the supplied collaborators.
///
/// # Errors
///
/// Returns [`BootstrapError`] for the first step that fails; the reporter is
/// told about the failure before it is returned.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: &dyn HealthReporter,
    authenticator: Arc<dyn Authenticator>,
) -> Result<Daemon, BootstrapError> {
    reporter.bootstrap_starting();
    let result = assemble(loader, authenticator);
    match &result {
        Ok(daemon) => {
            reporter.bootstrap_succeeded(daemon.config(), daemon.app().dispatcher().router().len());
        }
        Err(error) => reporter.bootstrap_failed(error),
    }
    result
}

fn assemble(
    loader: &dyn ConfigLoader,
    authenticator: Arc<dyn Authenticator>,
) -> Result<Daemon, BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    let telemetry =
        telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;
    config
        .daemon_socket()
        .prepare_filesystem()
        .map_err(|source| BootstrapError::Socket { source })?;

    let options = DispatchOptions {
        resolve_timeout: config.resolve_timeout(),
    };
    let app = App::new(authenticator, options)
        .map_err(|source| BootstrapError::Application { source })?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("courierd-resolver")
        .build()
        .map_err(|source| BootstrapError::Runtime { source })?;

    Ok(Daemon {
        config,
        app: Arc::new(app),
        runtime,
        telemetry,
    })
}
