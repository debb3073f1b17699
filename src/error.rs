//! Error types for the monitor's boundaries.

use std::path::PathBuf;

use thiserror::Error;

/// Failures talking to the monitored data store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be opened at all. Aborts the whole cycle.
    #[error("cannot open data store {path}: {reason}")]
    Unreachable {
        /// Path that was opened.
        path: PathBuf,
        /// Underlying driver message.
        reason: String,
    },
    /// A single table could not be read. Only that table's fingerprint is affected.
    #[error("cannot read table {table}: {reason}")]
    TableRead {
        /// Table that failed.
        table: String,
        /// Underlying driver message.
        reason: String,
    },
}

/// Failures of an external rebuild attempt.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The rebuild process could not be started.
    #[error("failed to spawn rebuild command: {0}")]
    Spawn(String),
    /// The rebuild process exited unsuccessfully.
    #[error("rebuild command exited with code {code}: {stderr}")]
    NonZeroExit {
        /// Exit code, `-1` when terminated by a signal.
        code: i32,
        /// Captured (possibly truncated) standard error.
        stderr: String,
    },
    /// The rebuild process exceeded the configured timeout and was killed.
    #[error("rebuild command timed out after {secs} seconds: {stderr}")]
    TimedOut {
        /// The configured timeout.
        secs: u64,
        /// Standard error captured before the process was killed.
        stderr: String,
    },
}

/// Failures reading or writing the persisted monitor state.
#[derive(Debug, Error)]
pub enum StateError {
    /// The state file exists but could not be read.
    #[error("failed to read state file {path}: {reason}")]
    Read {
        /// State file path.
        path: PathBuf,
        /// I/O error message.
        reason: String,
    },
    /// The state file contents are not valid state JSON.
    #[error("failed to parse state file {path}: {source}")]
    Parse {
        /// State file path.
        path: PathBuf,
        /// Parser error.
        #[source]
        source: serde_json::Error,
    },
    /// The state could not be serialized.
    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
    /// The state file could not be written.
    #[error("failed to write state file {path}: {reason}")]
    Write {
        /// State file path.
        path: PathBuf,
        /// I/O error message.
        reason: String,
    },
}

/// Invalid or unreadable configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The YAML config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Config file path.
        path: PathBuf,
        /// I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The YAML config file could not be parsed.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// Parser error.
        #[source]
        source: serde_yaml::Error,
    },
    /// An environment variable held a value of the wrong shape.
    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv {
        /// Variable name.
        var: String,
        /// Raw value.
        value: String,
    },
    /// The merged configuration violates a constraint.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
