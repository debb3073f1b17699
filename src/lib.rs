//! Core library entry for the `rebuild-monitor` CLI.
//!
//! The monitor polls a fixed list of SQLite tables, fingerprints their
//! contents and runs an external rebuild command when a fingerprint
//! changes, at most one rebuild at a time and no more often than a
//! configured minimum interval.

pub mod adapters;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod detect;
pub mod error;
pub mod fingerprint;
pub mod guard;
pub mod logging;
pub mod monitor;
pub mod ports;
pub mod preflight;
pub mod scheduler;
pub mod state;

use clap::error::ErrorKind;
use clap::Parser;

/// Run the CLI with the provided arguments.
///
/// A `.env` file in the working directory, if present, is loaded into the
/// environment before configuration is resolved.
///
/// # Errors
///
/// Returns an error string when argument parsing, configuration or command
/// execution fails.
pub fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match cli::Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{err}");
                return Ok(());
            }
            _ => return Err(err.to_string()),
        },
    };
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            return Err(format!("Failed to load .env: {err}"));
        }
    }
    commands::dispatch(&cli)
}
