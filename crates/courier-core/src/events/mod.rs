//! In-process event notification.
//!
//! A [`Notifier`] maps event names to ordered listener lists. Emitting an
//! event invokes every listener registered before the emission, synchronously
//! and in subscription order. Listener panics are caught and counted in the
//! returned [`EmitReport`]; they never reach the emitter.

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

/// Tracing target for event notification.
pub(crate) const EVENTS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::events");

type Listener<P> = Arc<dyn Fn(&P) + Send + Sync>;

/// Handle identifying a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Returns the raw identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "sub-{}", self.0)
    }
}

/// Outcome of a single emission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitReport {
    /// Listeners that returned normally.
    pub delivered: usize,
    /// Listeners that panicked.
    pub failed: usize,
}

impl EmitReport {
    /// Returns the number of listeners invoked.
    #[must_use]
    pub const fn invoked(self) -> usize {
        self.delivered + self.failed
    }
}

struct Registry<P> {
    next_id: u64,
    listeners: HashMap<String, Vec<(SubscriptionId, Listener<P>)>>,
}

/// Named-event publisher with synchronous, ordered delivery.
///
/// ```
/// use std::sync::{Arc, Mutex};
///
/// use courier_core::Notifier;
///
/// let notifier: Notifier<String> = Notifier::new();
/// let received = Arc::new(Mutex::new(Vec::new()));
/// let sink = Arc::clone(&received);
/// notifier.subscribe("newMessage", move |text: &String| {
///     if let Ok(mut seen) = sink.lock() {
///         seen.push(text.clone());
///     }
/// });
///
/// let report = notifier.emit("newMessage", &String::from("hi"));
/// assert_eq!(report.delivered, 1);
/// assert_eq!(*received.lock().unwrap(), vec![String::from("hi")]);
/// ```
pub struct Notifier<P> {
    registry: Mutex<Registry<P>>,
}

impl<P> Notifier<P> {
    /// Creates a notifier without listeners.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(Registry {
                next_id: 0,
                listeners: HashMap::new(),
            }),
        }
    }

    /// Registers a listener for `event`.
    pub fn subscribe<F>(&self, event: impl Into<String>, listener: F) -> SubscriptionId
    where
        F: Fn(&P) + Send + Sync + 'static,
    {
        let event = event.into();
        let mut registry = self.lock();
        registry.next_id += 1;
        let id = SubscriptionId(registry.next_id);
        debug!(target: EVENTS_TARGET, event = event.as_str(), %id, "listener subscribed");
        registry
            .listeners
            .entry(event)
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    /// Removes a subscription. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut registry = self.lock();
        let mut removed = false;
        registry.listeners.retain(|_, listeners| {
            let before = listeners.len();
            listeners.retain(|(existing, _)| *existing != id);
            removed |= listeners.len() != before;
            !listeners.is_empty()
        });
        if removed {
            debug!(target: EVENTS_TARGET, %id, "listener unsubscribed");
        }
        removed
    }

    /// Invokes every listener currently registered for `event`.
    ///
    /// The listener list is copied before invocation, so listeners may
    /// subscribe, unsubscribe or emit without deadlocking. Listeners added
    /// during an emission are not invoked by it.
    pub fn emit(&self, event: &str, payload: &P) -> EmitReport {
        let snapshot: Vec<Listener<P>> = self
            .lock()
            .listeners
            .get(event)
            .map(|listeners| listeners.iter().map(|(_, listener)| Arc::clone(listener)).collect())
            .unwrap_or_default();

        let mut report = EmitReport::default();
        for listener in snapshot {
            match panic::catch_unwind(AssertUnwindSafe(|| listener(payload))) {
                Ok(()) => report.delivered += 1,
                Err(_) => {
                    warn!(target: EVENTS_TARGET, event, "listener panicked");
                    report.failed += 1;
                }
            }
        }
        debug!(
            target: EVENTS_TARGET,
            event,
            delivered = report.delivered,
            failed = report.failed,
            "event emitted"
        );
        report
    }

    /// Returns the number of listeners registered for `event`.
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.lock().listeners.get(event).map_or(0, Vec::len)
    }

    fn lock(&self) -> MutexGuard<'_, Registry<P>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<P> Default for Notifier<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> fmt::Debug for Notifier<P> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.lock();
        let mut counts: Vec<_> = registry
            .listeners
            .iter()
            .map(|(event, listeners)| (event.as_str(), listeners.len()))
            .collect();
        counts.sort_unstable();
        formatter
            .debug_struct("Notifier")
            .field("listeners", &counts)
            .finish()
    }
}

#[cfg(test)]
mod tests;
