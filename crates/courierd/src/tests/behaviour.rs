//! Behavioural tests for the daemon bootstrap sequence.

use std::cell::RefCell;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use super::support::{self, HealthEvent, TestWorld};

#[fixture]
fn world() -> RefCell<TestWorld> {
    support::world()
}

#[given("a healthy configuration loader")]
fn given_healthy_loader(world: &RefCell<TestWorld>) {
    world.borrow_mut().use_successful_loader();
}

#[given("a failing configuration loader")]
fn given_failing_loader(world: &RefCell<TestWorld>) {
    world.borrow_mut().use_failing_loader();
}

#[when("the daemon bootstrap runs")]
fn when_bootstrap_runs(world: &RefCell<TestWorld>) {
    world.borrow_mut().bootstrap();
}

#[then("bootstrap succeeds")]
fn then_bootstrap_succeeds(world: &RefCell<TestWorld>) {
    let world = world.borrow();
    assert!(
        world.bootstrap_error().is_none(),
        "bootstrap error: {:?}",
        world.bootstrap_error()
    );
    assert!(world.daemon().is_some(), "daemon should have been built");
}

#[then("bootstrap fails")]
fn then_bootstrap_fails(world: &RefCell<TestWorld>) {
    let world = world.borrow();
    assert!(world.daemon().is_none(), "bootstrap succeeded unexpectedly");
    assert!(
        matches!(
            world.bootstrap_error(),
            Some(crate::BootstrapError::Configuration { .. })
        ),
        "unexpected error: {:?}",
        world.bootstrap_error()
    );
}

#[then("the daemon serves {count} procedures")]
fn then_daemon_serves(world: &RefCell<TestWorld>, count: usize) {
    let world = world.borrow();
    let daemon = world.daemon().expect("daemon built");
    assert_eq!(daemon.app().dispatcher().router().len(), count);
}

#[then("the reporter recorded bootstrap start")]
fn then_reporter_start(world: &RefCell<TestWorld>) {
    let events = world.borrow().reporter.events();
    assert_eq!(
        events.first(),
        Some(&HealthEvent::BootstrapStarting),
        "bootstrap start event missing: {events:?}"
    );
}

#[then("the reporter recorded bootstrap success with {count} procedures")]
fn then_reporter_success(world: &RefCell<TestWorld>, count: usize) {
    let events = world.borrow().reporter.events();
    assert!(
        events.contains(&HealthEvent::BootstrapSucceeded { procedures: count }),
        "bootstrap success event missing: {events:?}"
    );
}

#[then("the reporter recorded bootstrap failure")]
fn then_reporter_failure(world: &RefCell<TestWorld>) {
    let events = world.borrow().reporter.events();
    let failed = events
        .iter()
        .any(|event| matches!(event, HealthEvent::BootstrapFailed(_)));
    assert!(failed, "bootstrap failure event missing: {events:?}");
}

#[scenario(
    path = "tests/features/daemon_bootstrap.feature",
    name = "Bootstrapping with a valid configuration"
)]
fn bootstrap_succeeds(world: RefCell<TestWorld>) {
    let _ = world;
}

#[scenario(
    path = "tests/features/daemon_bootstrap.feature",
    name = "Bootstrapping with an invalid socket"
)]
fn bootstrap_fails(world: RefCell<TestWorld>) {
    let _ = world;
}
