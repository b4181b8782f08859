//! Entry point for the courier daemon binary.

use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    match courierd::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let mut stderr = io::stderr().lock();
            if writeln!(stderr, "courierd: {error}").is_err() {
                return ExitCode::from(2);
            }
            ExitCode::FAILURE
        }
    }
}
