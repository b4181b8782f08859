//! Blocking wait for a termination request.

use std::io;

use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::info;

use super::PROCESS_TARGET;

/// Something the launch sequence can block on until the daemon should stop.
pub trait ShutdownSignal: Send + Sync {
    /// Blocks until shutdown should proceed.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError`] if the wait cannot be armed.
    fn wait(&self) -> Result<(), ShutdownError>;
}

/// Failure to arm a shutdown wait.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Registering the signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Waits for one of a set of POSIX signals, `SIGTERM` and `SIGINT` by default.
#[derive(Debug, Clone)]
pub struct SystemShutdownSignal {
    signals: Vec<i32>,
}

impl SystemShutdownSignal {
    /// Listens for `SIGTERM` and `SIGINT`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_signals([SIGTERM, SIGINT])
    }

    /// Listens for an explicit set of signals.
    #[must_use]
    pub fn with_signals(signals: impl IntoIterator<Item = i32>) -> Self {
        Self {
            signals: signals.into_iter().collect(),
        }
    }
}

impl Default for SystemShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal for SystemShutdownSignal {
    fn wait(&self) -> Result<(), ShutdownError> {
        let mut pending =
            Signals::new(&self.signals).map_err(|source| ShutdownError::Install { source })?;
        if let Some(signal) = pending.forever().next() {
            info!(
                target: PROCESS_TARGET,
                signal = signal_name(signal),
                "stopping courierd"
            );
        }
        Ok(())
    }
}

fn signal_name(signal: i32) -> &'static str {
    match signal {
        SIGTERM => "SIGTERM",
        SIGINT => "SIGINT",
        _ => "other",
    }
}
