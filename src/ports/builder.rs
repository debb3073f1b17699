//! Builder port: the rebuild capability the monitor triggers.

use crate::error::BuildError;

/// Summary of a successful rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Captured standard output, possibly truncated.
    pub stdout: String,
    /// Captured standard error, possibly truncated.
    pub stderr: String,
    /// Whether either stream was cut at the capture limit.
    pub truncated: bool,
}

/// Performs one rebuild attempt.
///
/// The monitor never spawns processes itself; it calls this trait, so tests
/// substitute a builder that records calls and returns scripted results.
pub trait Builder: Send + Sync {
    /// Runs the rebuild to completion.
    ///
    /// # Errors
    ///
    /// Returns a [`BuildError`] when the rebuild cannot start, exits
    /// non-zero, or times out.
    fn attempt_rebuild(&self) -> Result<BuildReport, BuildError>;
}
