//! Debounce and single-flight guard for rebuilds.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Why a rebuild was not started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Another rebuild is still running.
    AlreadyInProgress,
    /// The previous attempt started less than the minimum interval ago.
    TooSoon {
        /// Time left until the next attempt may start.
        remaining: Duration,
    },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyInProgress => write!(f, "rebuild already in progress"),
            Self::TooSoon { remaining } => {
                let secs = remaining.as_secs().max(1);
                write!(f, "too soon since last rebuild, {secs}s remaining")
            }
        }
    }
}

#[derive(Debug)]
struct GuardState {
    in_progress: bool,
    last_rebuild_at: DateTime<Utc>,
}

/// Tracks whether a rebuild is running and when the last one started.
///
/// The check and the update happen under one lock, so two threads can never
/// both be approved.
#[derive(Debug)]
pub struct RebuildGuard {
    min_interval: Duration,
    state: Mutex<GuardState>,
}

impl RebuildGuard {
    /// Creates an idle guard whose last attempt is the Unix epoch.
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            state: Mutex::new(GuardState {
                in_progress: false,
                last_rebuild_at: DateTime::UNIX_EPOCH,
            }),
        }
    }

    /// Approves or rejects a rebuild starting at `now`.
    ///
    /// On approval the guard is marked in progress and `now` becomes the
    /// start of the debounce window. The returned permit clears the
    /// in-progress flag when dropped.
    ///
    /// # Errors
    ///
    /// Returns the [`SkipReason`] when the rebuild must not start.
    pub fn try_acquire(&self, now: DateTime<Utc>) -> Result<RebuildPermit<'_>, SkipReason> {
        let mut state = self.lock();
        if state.in_progress {
            return Err(SkipReason::AlreadyInProgress);
        }
        // A clock stepping backwards yields a negative elapsed; treat as zero.
        let elapsed = (now - state.last_rebuild_at).to_std().unwrap_or(Duration::ZERO);
        if elapsed < self.min_interval {
            return Err(SkipReason::TooSoon {
                remaining: self.min_interval - elapsed,
            });
        }
        state.in_progress = true;
        state.last_rebuild_at = now;
        Ok(RebuildPermit { guard: self })
    }

    /// Moves the start of the debounce window forward to `at`.
    ///
    /// A timestamp older than the current window start is ignored.
    pub fn resume_from(&self, at: DateTime<Utc>) {
        let mut state = self.lock();
        if at > state.last_rebuild_at {
            state.last_rebuild_at = at;
        }
    }

    /// Whether a rebuild is currently running.
    #[must_use]
    pub fn in_progress(&self) -> bool {
        self.lock().in_progress
    }

    /// Start time of the most recent approved attempt.
    #[must_use]
    pub fn last_rebuild_at(&self) -> DateTime<Utc> {
        self.lock().last_rebuild_at
    }

    fn lock(&self) -> MutexGuard<'_, GuardState> {
        // The state is two plain fields; a panic elsewhere cannot leave it torn.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Proof that a rebuild was approved. Dropping it releases the guard.
#[derive(Debug)]
#[must_use = "dropping the permit immediately releases the guard"]
pub struct RebuildPermit<'a> {
    guard: &'a RebuildGuard,
}

impl Drop for RebuildPermit<'_> {
    fn drop(&mut self) {
        self.guard.lock().in_progress = false;
    }
}
