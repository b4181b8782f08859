//! Failures that stop the daemon from launching or shutting down cleanly.

use thiserror::Error;

use super::shutdown::ShutdownError;
use crate::bootstrap::BootstrapError;
use crate::transport::ListenerError;

/// Why `courierd` stopped before or during serving.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The daemon could not be assembled.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    /// The socket could not be bound, or the accept thread died.
    #[error("listener on the daemon socket failed: {0}")]
    Listener(#[from] ListenerError),
    /// Waiting for a termination signal failed.
    #[error("cannot wait for a termination signal: {0}")]
    Shutdown(#[from] ShutdownError),
}
