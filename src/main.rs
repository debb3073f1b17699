//! Binary entrypoint for the `rebuild-monitor` CLI.

use std::process::ExitCode;

fn main() -> ExitCode {
    match rebuild_monitor::run(std::env::args()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
