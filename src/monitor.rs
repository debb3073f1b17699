//! One poll cycle: snapshot, compare, decide, rebuild, persist.
//!
//! Fingerprints are only written after a successful rebuild (or on first
//! run). A skipped or failed rebuild leaves the old fingerprints on disk so
//! the next cycle sees the same difference and tries again.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::MonitorConfig;
use crate::context::ServiceContext;
use crate::detect::detect_changes;
use crate::error::StoreError;
use crate::fingerprint::{take_snapshot, Snapshot};
use crate::guard::{RebuildGuard, SkipReason};
use crate::ports::builder::Builder;
use crate::ports::clock::Clock;
use crate::ports::store::DataStore;
use crate::state::{MonitorState, StateStore};

/// What a single cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The data store could not be opened; nothing else happened.
    StoreUnavailable,
    /// No usable previous state; fingerprints were recorded without rebuilding.
    Initialized,
    /// Every fingerprint matched the persisted state.
    Unchanged,
    /// Changes were found but the guard refused a rebuild.
    Skipped {
        /// Tables whose fingerprint changed.
        changed: Vec<String>,
        /// Why the rebuild was refused.
        reason: SkipReason,
    },
    /// Changes were found and the rebuild succeeded.
    Rebuilt {
        /// Tables whose fingerprint changed.
        changed: Vec<String>,
    },
    /// Changes were found and the rebuild failed.
    RebuildFailed {
        /// Tables whose fingerprint changed.
        changed: Vec<String>,
        /// The builder's error message.
        error: String,
    },
}

/// Change detector and rebuild trigger for a fixed set of tables.
///
/// Owns its [`RebuildGuard`], so independent monitors never share debounce
/// or in-progress state.
pub struct Monitor {
    tables: Vec<String>,
    clock: Arc<dyn Clock>,
    store: Arc<dyn DataStore>,
    builder: Arc<dyn Builder>,
    state: StateStore,
    guard: RebuildGuard,
}

impl Monitor {
    /// Wires a monitor from the service context and configuration.
    #[must_use]
    pub fn new(ctx: &ServiceContext, config: &MonitorConfig) -> Self {
        Self {
            tables: config.tables.clone(),
            clock: Arc::clone(&ctx.clock),
            store: Arc::clone(&ctx.store),
            builder: Arc::clone(&ctx.builder),
            state: StateStore::new(Arc::clone(&ctx.fs), &config.state_file),
            guard: RebuildGuard::new(config.min_rebuild_interval()),
        }
    }

    /// The monitor's rebuild guard.
    #[must_use]
    pub fn guard(&self) -> &RebuildGuard {
        &self.guard
    }

    /// The monitor's state store.
    #[must_use]
    pub fn state(&self) -> &StateStore {
        &self.state
    }

    /// Starts the debounce window at the persisted `lastRebuild`, if any.
    ///
    /// A new guard starts at the Unix epoch. Short-lived processes that each
    /// run a single cycle call this so a rebuild made by an earlier process
    /// still counts toward the minimum interval.
    pub fn resume_debounce(&self) {
        match self.state.load() {
            Ok(Some(MonitorState {
                last_rebuild: Some(at),
                ..
            })) => {
                debug!("Debounce window resumes from last rebuild at {at}");
                self.guard.resume_from(at);
            }
            Ok(_) => {}
            Err(e) => warn!("Cannot resume debounce window: {e}"),
        }
    }

    /// Reads and fingerprints every monitored table without touching state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unreachable`] if the store cannot be opened.
    pub fn snapshot(&self) -> Result<Snapshot, StoreError> {
        let conn = self.store.connect()?;
        Ok(take_snapshot(conn.as_ref(), &self.tables))
    }

    /// Runs one detect → decide → rebuild cycle.
    ///
    /// Never fails: every error is logged and reflected in the outcome.
    pub fn run_cycle(&self) -> CycleOutcome {
        let snapshot = match self.snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("Skipping cycle: {e}");
                return CycleOutcome::StoreUnavailable;
            }
        };

        let previous = match self.state.load() {
            Ok(Some(state)) => state,
            Ok(None) => {
                info!("No previous state found, recording initial checksums");
                return self.initialize(&snapshot);
            }
            Err(e) => {
                error!("{e}; treating this cycle as a first run");
                return self.initialize(&snapshot);
            }
        };

        let changed = detect_changes(&previous.checksums, &snapshot, &self.tables);
        if changed.is_empty() {
            debug!("No changes detected");
            return CycleOutcome::Unchanged;
        }
        info!("Changes detected in: {}", changed.join(", "));

        let permit = match self.guard.try_acquire(self.clock.now()) {
            Ok(permit) => permit,
            Err(reason) => {
                warn!("Skipping rebuild: {reason}");
                return CycleOutcome::Skipped { changed, reason };
            }
        };

        info!("Triggering rebuild");
        let result = self.builder.attempt_rebuild();
        drop(permit);

        match result {
            Ok(_) => {
                let state = MonitorState {
                    checksums: snapshot.checksums(),
                    last_rebuild: Some(self.clock.now()),
                };
                if let Err(e) = self.state.save(&state) {
                    error!("Rebuild succeeded but state was not saved: {e}");
                }
                info!("Rebuild completed successfully");
                CycleOutcome::Rebuilt { changed }
            }
            Err(e) => {
                error!("Rebuild failed: {e}");
                CycleOutcome::RebuildFailed {
                    changed,
                    error: e.to_string(),
                }
            }
        }
    }

    fn initialize(&self, snapshot: &Snapshot) -> CycleOutcome {
        let state = MonitorState {
            checksums: snapshot.checksums(),
            last_rebuild: None,
        };
        match self.state.save(&state) {
            Ok(()) => info!("Initial state saved to {}", self.state.path().display()),
            Err(e) => error!("Failed to save initial state: {e}"),
        }
        CycleOutcome::Initialized
    }
}
