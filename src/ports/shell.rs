//! Shell executor port for running external commands.

use std::path::PathBuf;
use std::time::Duration;

/// A command to run through the system shell.
#[derive(Debug, Clone)]
pub struct ShellRequest {
    /// The command line passed to `sh -c`.
    pub command: String,
    /// Working directory for the child process.
    pub workdir: PathBuf,
    /// Upper bound on captured bytes per output stream.
    pub max_output_bytes: usize,
    /// Kill the child once this much time has elapsed.
    pub timeout: Option<Duration>,
}

/// The output of a shell command execution.
#[derive(Debug, Clone, Default)]
pub struct ShellOutput {
    /// The exit code of the process, `-1` when killed by a signal.
    pub exit_code: i32,
    /// The captured standard output.
    pub stdout: String,
    /// The captured standard error.
    pub stderr: String,
    /// `true` when either stream exceeded `max_output_bytes`.
    pub truncated: bool,
    /// `true` when the child was killed after `timeout` elapsed.
    pub timed_out: bool,
}

/// Executes shell commands.
pub trait ShellExecutor: Send + Sync {
    /// Runs a command in the system shell and returns its output.
    ///
    /// A non-zero exit is reported through [`ShellOutput::exit_code`], not as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be spawned or waited on.
    fn run(
        &self,
        request: &ShellRequest,
    ) -> Result<ShellOutput, Box<dyn std::error::Error + Send + Sync>>;
}
