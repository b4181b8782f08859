//! Launch sequencing: bootstrap, listen, wait for shutdown, stop.

use std::sync::Arc;

use tracing::info;

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};
use crate::app::{Authenticator, StaticTokenAuthenticator};
use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::transport::SocketListener;

/// Collaborators required to run the daemon.
pub struct LaunchPlan<L, S> {
    /// Source of the configuration.
    pub loader: L,
    /// Receiver of lifecycle events.
    pub reporter: Arc<dyn HealthReporter>,
    /// Resolves callers from their tokens.
    pub authenticator: Arc<dyn Authenticator>,
    /// Blocks until the daemon should stop.
    pub shutdown: S,
}

/// Runs the daemon using the production collaborators.
///
/// # Errors
///
/// Returns [`LaunchError`] if bootstrap, binding or signal handling fails.
pub fn run_daemon() -> Result<(), LaunchError> {
    run_daemon_with(LaunchPlan {
        loader: SystemConfigLoader,
        reporter: Arc::new(StructuredHealthReporter::new()),
        authenticator: Arc::new(StaticTokenAuthenticator::default()),
        shutdown: SystemShutdownSignal::new(),
    })
}

/// Runs the daemon with injected collaborators.
///
/// # Errors
///
/// Returns [`LaunchError`] if bootstrap, binding or signal handling fails.
pub fn run_daemon_with<L, S>(plan: LaunchPlan<L, S>) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    S: ShutdownSignal,
{
    let LaunchPlan {
        loader,
        reporter,
        authenticator,
        shutdown,
    } = plan;

    let daemon = bootstrap_with(&loader, reporter.as_ref(), authenticator)?;
    let endpoint = daemon.config().daemon_socket().clone();
    let listener = SocketListener::bind(&endpoint)?;
    let handle = listener.start(Arc::new(daemon.connection_handler()))?;
    reporter.listener_started(&endpoint);

    let waited = shutdown.wait();
    handle.shutdown();
    let accepted = handle.accepted();
    let joined = handle.join();
    reporter.listener_stopped(&endpoint, accepted);
    drop(daemon);
    waited?;
    joined?;

    info!(
        target: PROCESS_TARGET,
        "shutdown sequence completed"
    );
    Ok(())
}
