//! The courier daemon.
//!
//! `courierd` hosts the posts, messages and greeting procedures behind a
//! single merged router and serves them over a socket configured via
//! [`courier_config`]. Each connection carries one JSON call line and receives
//! one JSON result line.
//!
//! Startup follows a fixed sequence: load configuration, initialise
//! structured telemetry, prepare the socket filesystem, assemble the
//! application and start the resolver runtime. Health reporting hooks emit a
//! structured event at each stage so operators can see where a launch
//! stopped.
//!
//! Calls carry optional headers. The `authorization` header is handed to an
//! [`app::Authenticator`] while the per-call context is built, and resolvers
//! decide for themselves whether an anonymous caller may proceed.

pub mod app;
mod bootstrap;
pub mod dispatch;
mod health;
mod process;
pub mod telemetry;
pub mod transport;

pub use app::App;
pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{
    LaunchError, LaunchPlan, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_daemon,
    run_daemon_with,
};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
