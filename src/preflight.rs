//! Start-up checks run before the first poll cycle.
//!
//! Missing state and log directories are created once. Anything else that
//! would make every cycle fail (no working directory for the rebuild, the
//! rebuild program missing from `PATH`) stops the process before it starts
//! polling.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::MonitorConfig;
use crate::context::ServiceContext;
use crate::ports::shell::ShellRequest;

/// What the checks had to fix.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PreflightReport {
    /// Directories that did not exist and were created.
    pub created_dirs: Vec<PathBuf>,
}

/// Runs every start-up check.
///
/// # Errors
///
/// Returns a description of the first problem that could not be fixed.
pub fn run(ctx: &ServiceContext, config: &MonitorConfig) -> Result<PreflightReport, String> {
    let mut report = PreflightReport::default();

    for file in [&config.state_file, &config.log_file] {
        if let Some(dir) = parent_dir(file) {
            if !ctx.fs.exists(dir) {
                ctx.fs.create_dir_all(dir).map_err(|e| {
                    format!("Failed to create directory {}: {e}", dir.display())
                })?;
                info!("Created missing directory {}", dir.display());
                report.created_dirs.push(dir.to_path_buf());
            }
        }
    }

    if !ctx.fs.exists(&config.rebuild_workdir) {
        return Err(format!(
            "Rebuild working directory {} does not exist",
            config.rebuild_workdir.display()
        ));
    }

    if !ctx.fs.exists(&config.database_path) {
        // Not fatal: the database may appear later and each cycle retries.
        warn!(
            "Database {} does not exist yet",
            config.database_path.display()
        );
    }

    if let Some(program) = rebuild_program(&config.rebuild_command) {
        let lookup = ShellRequest {
            command: format!("command -v {program}"),
            workdir: config.rebuild_workdir.clone(),
            max_output_bytes: 4096,
            timeout: None,
        };
        let found = ctx
            .shell
            .run(&lookup)
            .map_err(|e| format!("Cannot run shell: {e}"))?;
        if found.exit_code != 0 {
            return Err(format!("Rebuild program `{program}` was not found on PATH"));
        }
    }

    Ok(report)
}

fn parent_dir(file: &Path) -> Option<&Path> {
    file.parent().filter(|p| !p.as_os_str().is_empty())
}

/// First word of the command, when it is a plain program name or path.
fn rebuild_program(command: &str) -> Option<&str> {
    let first = command.split_whitespace().next()?;
    let plain = first
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "._-/+".contains(c));
    plain.then_some(first)
}
