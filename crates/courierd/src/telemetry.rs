//! Process-wide tracing subscriber for the daemon.

use std::io::{self, IsTerminal};

use courier_config::{Config, LogFormat};
use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

static INSTALLED_FORMAT: OnceCell<LogFormat> = OnceCell::new();

/// Proof that the global subscriber is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryHandle {
    format: LogFormat,
}

impl TelemetryHandle {
    /// Output format of the installed subscriber, which is the one requested
    /// by the first successful [`initialise`] call.
    #[must_use]
    pub const fn format(self) -> LogFormat {
        self.format
    }
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured log filter expression is invalid.
    #[error("invalid log filter '{filter}': {message}")]
    Filter {
        /// The rejected directive string.
        filter: String,
        /// Parser diagnostic.
        message: String,
    },
    /// Another subscriber was already installed globally.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(#[source] SetGlobalDefaultError),
}

/// Installs the global tracing subscriber on first use.
///
/// Later calls leave the global subscriber alone and return a handle
/// describing the one already installed.
///
/// # Errors
///
/// Returns [`TelemetryError`] if the filter does not parse or another
/// subscriber was installed outside this module.
///
/// # Examples
///
/// ```rust
/// use courier_config::{Config, LogFormat};
/// use courierd::telemetry;
///
/// # fn main() -> Result<(), courierd::TelemetryError> {
/// let first = telemetry::initialise(&Config::default())?;
/// let json = Config {
///     log_format: LogFormat::Json,
///     ..Config::default()
/// };
/// let second = telemetry::initialise(&json)?;
/// assert_eq!(first.format(), second.format());
/// # Ok(())
/// # }
/// ```
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    INSTALLED_FORMAT
        .get_or_try_init(|| install_subscriber(config).map(|()| config.log_format()))
        .map(|format| TelemetryHandle { format: *format })
}

fn install_subscriber(config: &Config) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(config.log_filter()).map_err(|error| {
        TelemetryError::Filter {
            filter: config.log_filter().to_owned(),
            message: error.to_string(),
        }
    })?;

    let format = config.log_format();
    // Resolvers run on the named runtime workers, connections on the named
    // listener threads.
    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .with_writer(io::stderr)
        .with_ansi(use_colour(format, io::stderr().is_terminal()))
        .with_timer(fmt::time::UtcTime::rfc_3339());

    let subscriber: Box<dyn Subscriber + Send + Sync> = match format {
        LogFormat::Json => Box::new(builder.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder.compact().finish()),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}

const fn use_colour(format: LogFormat, terminal: bool) -> bool {
    terminal && !format.is_machine_readable()
}
