//! Rebuild capability backed by a shell command.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::BuildError;
use crate::ports::builder::{BuildReport, Builder};
use crate::ports::shell::{ShellExecutor, ShellRequest};

/// Runs the configured rebuild command line through a [`ShellExecutor`].
pub struct ShellBuilder {
    shell: Arc<dyn ShellExecutor>,
    request: ShellRequest,
}

impl ShellBuilder {
    /// Creates a builder that runs `request` on `shell` for every attempt.
    #[must_use]
    pub fn new(shell: Arc<dyn ShellExecutor>, request: ShellRequest) -> Self {
        Self { shell, request }
    }
}

impl Builder for ShellBuilder {
    fn attempt_rebuild(&self) -> Result<BuildReport, BuildError> {
        debug!(
            "Running rebuild command: {} (in {})",
            self.request.command,
            self.request.workdir.display()
        );
        let output = self
            .shell
            .run(&self.request)
            .map_err(|e| BuildError::Spawn(e.to_string()))?;

        if output.truncated {
            warn!(
                "Rebuild output exceeded {} bytes and was truncated",
                self.request.max_output_bytes
            );
        }
        if output.timed_out {
            let secs = self.request.timeout.map_or(0, |t| t.as_secs());
            return Err(BuildError::TimedOut {
                secs,
                stderr: output.stderr,
            });
        }
        if output.exit_code != 0 {
            return Err(BuildError::NonZeroExit {
                code: output.exit_code,
                stderr: output.stderr,
            });
        }

        if !output.stdout.trim().is_empty() {
            debug!("Rebuild output: {}", output.stdout.trim_end());
        }
        Ok(BuildReport {
            stdout: output.stdout,
            stderr: output.stderr,
            truncated: output.truncated,
        })
    }
}
