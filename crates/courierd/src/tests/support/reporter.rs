//! Test double for [`HealthReporter`] that records lifecycle events.

use std::sync::Mutex;

use courier_config::{Config, SocketEndpoint};

use crate::bootstrap::BootstrapError;
use crate::health::HealthReporter;

/// Lifecycle events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded { procedures: usize },
    BootstrapFailed(String),
    ListenerStarted,
    ListenerStopped { accepted: u64 },
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config, procedures: usize) {
        self.record(HealthEvent::BootstrapSucceeded { procedures });
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn listener_started(&self, _endpoint: &SocketEndpoint) {
        self.record(HealthEvent::ListenerStarted);
    }

    fn listener_stopped(&self, _endpoint: &SocketEndpoint, accepted: u64) {
        self.record(HealthEvent::ListenerStopped { accepted });
    }
}
