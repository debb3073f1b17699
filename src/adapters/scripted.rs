//! Deterministic in-memory adapters.
//!
//! These stand in for the live adapters in unit and integration tests: time
//! only moves when told to, the filesystem is a map, the data store is a set
//! of editable tables and the builder returns queued results while counting
//! calls.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::{BuildError, StoreError};
use crate::ports::builder::{BuildReport, Builder};
use crate::ports::clock::Clock;
use crate::ports::filesystem::FileSystem;
use crate::ports::store::{DataStore, StoreConnection, TableRows};

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clock that only advances when [`ManualClock::advance`] is called.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: TimeDelta) {
        *locked(&self.now) += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *locked(&self.now)
    }
}

/// Filesystem held in a map keyed by path.
#[derive(Debug, Default)]
pub struct MemFileSystem {
    files: Mutex<HashMap<PathBuf, String>>,
    dirs: Mutex<Vec<PathBuf>>,
    fail_writes: AtomicBool,
}

impl MemFileSystem {
    /// Creates an empty filesystem.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl FileSystem for MemFileSystem {
    fn read_to_string(
        &self,
        path: &Path,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        locked(&self.files)
            .get(path)
            .cloned()
            .ok_or_else(|| format!("File not found: {}", path.display()).into())
    }

    fn write(
        &self,
        path: &Path,
        contents: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(format!("read-only filesystem: {}", path.display()).into());
        }
        locked(&self.files).insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        locked(&self.files).contains_key(path)
            || locked(&self.dirs).iter().any(|d| d.starts_with(path))
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        locked(&self.dirs).push(path.to_path_buf());
        Ok(())
    }
}

/// Data store whose tables are edited directly by the test.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<BTreeMap<String, Result<TableRows, String>>>,
    unreachable: AtomicBool,
}

impl MemoryStore {
    /// Creates a reachable store with no tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces a table's rows. Rows are served in the order given.
    pub fn set_rows(&self, table: &str, rows: TableRows) {
        locked(&self.tables).insert(table.to_string(), Ok(rows));
    }

    /// Appends one row to a table, creating it if needed.
    pub fn push_row(&self, table: &str, row: serde_json::Map<String, serde_json::Value>) {
        let mut tables = locked(&self.tables);
        match tables.get_mut(table) {
            Some(Ok(rows)) => rows.push(row),
            _ => {
                tables.insert(table.to_string(), Ok(vec![row]));
            }
        }
    }

    /// Makes reads of `table` fail with `reason`.
    pub fn fail_table(&self, table: &str, reason: &str) {
        locked(&self.tables).insert(table.to_string(), Err(reason.to_string()));
    }

    /// Makes `connect` fail (or succeed again).
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }
}

impl DataStore for MemoryStore {
    fn connect(&self) -> Result<Box<dyn StoreConnection>, StoreError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(StoreError::Unreachable {
                path: PathBuf::from(":memory:"),
                reason: "unable to open database file".to_string(),
            });
        }
        // Connections see the tables as of connect time, like a read transaction.
        Ok(Box::new(MemoryConnection {
            tables: locked(&self.tables).clone(),
        }))
    }
}

struct MemoryConnection {
    tables: BTreeMap<String, Result<TableRows, String>>,
}

impl StoreConnection for MemoryConnection {
    fn read_table(&self, table: &str) -> Result<TableRows, StoreError> {
        match self.tables.get(table) {
            Some(Ok(rows)) => Ok(rows.clone()),
            Some(Err(reason)) => Err(StoreError::TableRead {
                table: table.to_string(),
                reason: reason.clone(),
            }),
            None => Err(StoreError::TableRead {
                table: table.to_string(),
                reason: format!("no such table: {table}"),
            }),
        }
    }
}

/// Builder that returns queued results and counts attempts.
///
/// With an empty queue every attempt succeeds.
#[derive(Debug, Default)]
pub struct ScriptedBuilder {
    results: Mutex<VecDeque<Result<BuildReport, BuildError>>>,
    calls: AtomicUsize,
}

impl ScriptedBuilder {
    /// Creates a builder that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the result of a future attempt.
    pub fn push_result(&self, result: Result<BuildReport, BuildError>) {
        locked(&self.results).push_back(result);
    }

    /// Number of attempts made so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Builder for ScriptedBuilder {
    fn attempt_rebuild(&self) -> Result<BuildReport, BuildError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        locked(&self.results)
            .pop_front()
            .unwrap_or_else(|| Ok(BuildReport::default()))
    }
}
