//! Persisted monitor state.
//!
//! The state file is a small JSON document:
//!
//! ```text
//! {
//!   "checksums": { "projects": "<sha256 hex>", "content": null },
//!   "lastRebuild": "2024-06-15T10:30:00Z"
//! }
//! ```
//!
//! It is replaced wholesale, never patched.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StateError;
use crate::fingerprint::Fingerprint;
use crate::ports::filesystem::FileSystem;

/// The last fingerprints acted upon and when the last rebuild succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorState {
    /// Table name → fingerprint.
    pub checksums: BTreeMap<String, Fingerprint>,
    /// Completion time of the last successful rebuild.
    #[serde(default)]
    pub last_rebuild: Option<DateTime<Utc>>,
}

/// Reads and writes [`MonitorState`] through the [`FileSystem`] port.
pub struct StateStore {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
}

impl StateStore {
    /// Creates a store for the state file at `path`.
    #[must_use]
    pub fn new(fs: Arc<dyn FileSystem>, path: &Path) -> Self {
        Self {
            fs,
            path: path.to_path_buf(),
        }
    }

    /// Location of the state file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the state, or `None` when no state file exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<Option<MonitorState>, StateError> {
        if !self.fs.exists(&self.path) {
            return Ok(None);
        }
        let contents = self
            .fs
            .read_to_string(&self.path)
            .map_err(|e| StateError::Read {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| StateError::Parse {
                path: self.path.clone(),
                source,
            })
    }

    /// Replaces the state file with `state`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, state: &MonitorState) -> Result<(), StateError> {
        let json = serde_json::to_string_pretty(state)?;
        self.fs
            .write(&self.path, &json)
            .map_err(|e| StateError::Write {
                path: self.path.clone(),
                reason: e.to_string(),
            })
    }
}
