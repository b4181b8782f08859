//! Shared configuration for the courier daemon.
//!
//! Configuration is layered by `ortho_config`: built-in defaults, then a
//! configuration file (`--config-path` or `COURIER_CONFIG_PATH`), then
//! `COURIER_*` environment variables, then command-line flags. Later layers
//! win.

mod defaults;
mod logging;
mod socket;

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use self::defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_RESOLVE_TIMEOUT_MS, DEFAULT_TCP_PORT, default_log_filter,
    default_log_filter_string, default_log_format, default_resolve_timeout_ms,
    default_socket_endpoint,
};
pub use self::logging::{LogFormat, LogFormatParseError};
pub use self::socket::{SocketEndpoint, SocketParseError, SocketPreparationError};

/// Daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "COURIER")]
pub struct Config {
    /// Socket the daemon listens on (`unix://PATH` or `tcp://HOST:PORT`).
    #[serde(default = "default_socket_endpoint")]
    pub daemon_socket: SocketEndpoint,
    /// Tracing filter expression, for example `info,courier_core=debug`.
    #[serde(default = "default_log_filter_string")]
    pub log_filter: String,
    /// Log output format (`json` or `compact`).
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
    /// Upper bound in milliseconds on context creation and on each
    /// resolver. Zero disables the bound.
    #[serde(default = "default_resolve_timeout_ms")]
    pub resolve_timeout_ms: u64,
}

impl Config {
    /// Returns the configured daemon socket.
    #[must_use]
    pub const fn daemon_socket(&self) -> &SocketEndpoint {
        &self.daemon_socket
    }

    /// Returns the tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Returns the log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Returns the raw resolve timeout in milliseconds.
    #[must_use]
    pub const fn resolve_timeout_ms(&self) -> u64 {
        self.resolve_timeout_ms
    }

    /// Returns the resolve timeout, or `None` when it is disabled.
    #[must_use]
    pub const fn resolve_timeout(&self) -> Option<Duration> {
        match self.resolve_timeout_ms {
            0 => None,
            millis => Some(Duration::from_millis(millis)),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            daemon_socket: default_socket_endpoint(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            resolve_timeout_ms: default_resolve_timeout_ms(),
        }
    }
}
