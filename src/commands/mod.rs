//! Command dispatch and handlers.

pub mod check;
pub mod once;
pub mod status;
pub mod watch;

use crate::cli::{Cli, Command};
use crate::config::MonitorConfig;
use crate::context::ServiceContext;

/// Resolve configuration and dispatch a parsed command to its handler.
///
/// # Errors
///
/// Returns an error string if configuration is invalid or the selected
/// command handler fails.
pub fn dispatch(cli: &Cli) -> Result<(), String> {
    let config = MonitorConfig::resolve(&cli.config, |key| std::env::var(key).ok())
        .map_err(|e| e.to_string())?;
    let ctx = ServiceContext::live(&config);

    match cli.command {
        Command::Watch => watch::run(&ctx, &config),
        Command::Once => once::run(&ctx, &config),
        Command::Status => status::run(&ctx, &config),
        Command::Check => check::run(&ctx, &config),
    }
}
