//! `rebuild-monitor once` command.

use tracing::error;

use crate::config::MonitorConfig;
use crate::context::ServiceContext;
use crate::monitor::{CycleOutcome, Monitor};
use crate::{logging, preflight};

/// Execute the `once` command: one poll cycle, suitable for cron.
///
/// The debounce window resumes from the persisted last rebuild, so back to
/// back invocations respect the minimum rebuild interval.
///
/// # Errors
///
/// Returns an error string if start-up checks fail, the store is
/// unreachable, or the rebuild fails.
pub fn run(ctx: &ServiceContext, config: &MonitorConfig) -> Result<(), String> {
    logging::init(Some(&config.log_file))?;
    preflight::run(ctx, config).map_err(|e| {
        error!("Start-up check failed: {e}");
        e
    })?;

    let monitor = Monitor::new(ctx, config);
    monitor.resume_debounce();
    let outcome = monitor.run_cycle();
    let summary = describe(&outcome);
    match outcome {
        CycleOutcome::StoreUnavailable | CycleOutcome::RebuildFailed { .. } => Err(summary),
        _ => {
            println!("{summary}");
            Ok(())
        }
    }
}

/// One-line human summary of a cycle outcome.
#[must_use]
pub fn describe(outcome: &CycleOutcome) -> String {
    match outcome {
        CycleOutcome::StoreUnavailable => "Data store unavailable; nothing checked.".to_string(),
        CycleOutcome::Initialized => "State initialized; no rebuild on first run.".to_string(),
        CycleOutcome::Unchanged => "No changes detected.".to_string(),
        CycleOutcome::Skipped { changed, reason } => {
            let tables = changed.join(", ");
            format!("Changes in {tables}; rebuild skipped: {reason}.")
        }
        CycleOutcome::Rebuilt { changed } => {
            format!("Changes in {}; rebuild completed.", changed.join(", "))
        }
        CycleOutcome::RebuildFailed { changed, error } => {
            format!("Changes in {}; rebuild failed: {error}", changed.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::guard::SkipReason;

    #[test]
    fn describes_every_outcome() {
        let changed = vec!["projects".to_string(), "content".to_string()];

        assert_eq!(describe(&CycleOutcome::Unchanged), "No changes detected.");
        assert!(describe(&CycleOutcome::Initialized).contains("first run"));
        let skipped = describe(&CycleOutcome::Skipped {
            changed: changed.clone(),
            reason: SkipReason::TooSoon {
                remaining: Duration::from_secs(42),
            },
        });
        assert!(skipped.starts_with("Changes in projects, content;"));
        assert!(skipped.contains("; rebuild skipped: too soon"));
        assert!(skipped.ends_with("last rebuild, 42s remaining."));
        assert_eq!(
            describe(&CycleOutcome::Rebuilt {
                changed: changed.clone(),
            }),
            "Changes in projects, content; rebuild completed."
        );
        let failed = describe(&CycleOutcome::RebuildFailed {
            changed,
            error: "exit 1".into(),
        });
        assert!(failed.ends_with("rebuild failed: exit 1"));
    }
}
