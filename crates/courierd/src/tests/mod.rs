//! Test suites for the courier daemon.

mod behaviour;
mod support;
