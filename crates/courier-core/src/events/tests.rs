//! Unit tests for event notification.

use std::sync::{Arc, Mutex};

use rstest::{fixture, rstest};

use super::*;

type Log = Arc<Mutex<Vec<String>>>;

#[fixture]
fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn record(log: &Log, label: &'static str) -> impl Fn(&String) + Send + Sync + 'static {
    let log = Arc::clone(log);
    move |payload: &String| {
        log.lock()
            .expect("log lock")
            .push(format!("{label}:{payload}"));
    }
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().expect("log lock").clone()
}

#[rstest]
fn listeners_run_in_subscription_order_exactly_once(log: Log) {
    let notifier = Notifier::new();
    notifier.subscribe("newMessage", record(&log, "first"));
    notifier.subscribe("newMessage", record(&log, "second"));
    notifier.subscribe("other", record(&log, "other"));

    let report = notifier.emit("newMessage", &String::from("hi"));

    assert_eq!(report, EmitReport { delivered: 2, failed: 0 });
    assert_eq!(entries(&log), vec!["first:hi", "second:hi"]);
}

#[rstest]
fn emit_without_listeners_is_a_no_op() {
    let notifier: Notifier<String> = Notifier::new();
    let report = notifier.emit("newMessage", &String::from("hi"));
    assert_eq!(report.invoked(), 0);
}

#[rstest]
fn unsubscribed_listeners_are_skipped(log: Log) {
    let notifier = Notifier::new();
    let first = notifier.subscribe("newMessage", record(&log, "first"));
    notifier.subscribe("newMessage", record(&log, "second"));

    assert!(notifier.unsubscribe(first));
    assert!(!notifier.unsubscribe(first));
    assert_eq!(notifier.listener_count("newMessage"), 1);

    notifier.emit("newMessage", &String::from("hi"));
    assert_eq!(entries(&log), vec!["second:hi"]);
}

#[rstest]
fn panicking_listener_does_not_stop_delivery(log: Log) {
    let notifier = Notifier::new();
    notifier.subscribe("newMessage", |_payload: &String| panic!("listener exploded"));
    notifier.subscribe("newMessage", record(&log, "after"));

    let report = notifier.emit("newMessage", &String::from("hi"));

    assert_eq!(report, EmitReport { delivered: 1, failed: 1 });
    assert_eq!(entries(&log), vec!["after:hi"]);
}

#[rstest]
fn listeners_added_during_emit_wait_for_the_next_event(log: Log) {
    let notifier = Arc::new(Notifier::new());
    let inner = Arc::clone(&notifier);
    let late_log = Arc::clone(&log);
    notifier.subscribe("newMessage", move |_payload: &String| {
        let sink = Arc::clone(&late_log);
        inner.subscribe("newMessage", move |payload: &String| {
            sink.lock().expect("log lock").push(format!("late:{payload}"));
        });
    });

    let first = notifier.emit("newMessage", &String::from("one"));
    assert_eq!(first.delivered, 1);
    assert!(entries(&log).is_empty());

    notifier.emit("newMessage", &String::from("two"));
    assert_eq!(entries(&log), vec!["late:two"]);
}

#[test]
fn subscription_ids_are_unique() {
    let notifier: Notifier<()> = Notifier::default();
    let first = notifier.subscribe("a", |_: &()| {});
    let second = notifier.subscribe("b", |_: &()| {});
    assert_ne!(first, second);
    assert!(second.get() > first.get());
}
