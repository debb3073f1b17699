//! `rebuild-monitor check` command.

use std::fmt::Write as _;

use crate::config::MonitorConfig;
use crate::context::ServiceContext;
use crate::detect::detect_changes;
use crate::fingerprint::{Fingerprint, Snapshot};
use crate::monitor::Monitor;
use crate::{logging, preflight};

/// Execute the `check` command.
///
/// Runs the start-up checks, fingerprints every table once and compares the
/// result with the saved state. Nothing is written and no rebuild runs.
///
/// # Errors
///
/// Returns an error string if a start-up check fails or the store cannot
/// be opened.
pub fn run(ctx: &ServiceContext, config: &MonitorConfig) -> Result<(), String> {
    logging::init(None)?;
    let report = preflight::run(ctx, config)?;
    for dir in &report.created_dirs {
        println!("Created {}", dir.display());
    }

    let monitor = Monitor::new(ctx, config);
    let snapshot = monitor.snapshot().map_err(|e| e.to_string())?;
    let changed = match monitor.state().load() {
        Ok(Some(state)) => Some(detect_changes(&state.checksums, &snapshot, &config.tables)),
        Ok(None) | Err(_) => None,
    };

    print!("{}", render(&snapshot, changed.as_deref()));
    Ok(())
}

/// Renders per-table row counts and fingerprints.
///
/// `changed` is `None` when there is no saved state to compare against.
#[must_use]
pub fn render(snapshot: &Snapshot, changed: Option<&[String]>) -> String {
    let rows: Vec<(&str, String, String)> = snapshot
        .tables
        .iter()
        .map(|t| {
            let count = t.row_count.map_or_else(|| "-".into(), |n| n.to_string());
            let fp = match &t.fingerprint {
                Fingerprint::Known(digest) => digest.clone(),
                Fingerprint::Unknown(reason) => format!("unknown ({reason})"),
            };
            (t.table_name.as_str(), count, fp)
        })
        .collect();

    let table_width = rows.iter().map(|r| r.0.len()).max().unwrap_or(5).max(5);
    let count_width = rows.iter().map(|r| r.1.len()).max().unwrap_or(4).max(4);

    let mut out = String::new();
    let header = format!("{:<table_width$}  {:>count_width$}", "TABLE", "ROWS");
    let _ = writeln!(out, "{header}  FINGERPRINT");
    for (table, count, fp) in &rows {
        let _ = writeln!(out, "{table:<table_width$}  {count:>count_width$}  {fp}");
    }
    let _ = match changed {
        None => writeln!(out, "\nNo saved state to compare against."),
        Some([]) => writeln!(out, "\nMatches saved state."),
        Some(tables) => writeln!(out, "\nDiffers from saved state: {}", tables.join(", ")),
    };
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::TableSnapshot;

    fn snapshot() -> Snapshot {
        Snapshot {
            tables: vec![
                TableSnapshot {
                    table_name: "projects".into(),
                    row_count: Some(12),
                    fingerprint: Fingerprint::Known("beef".into()),
                },
                TableSnapshot {
                    table_name: "team_members".into(),
                    row_count: None,
                    fingerprint: Fingerprint::Unknown("no such table: team_members".into()),
                },
            ],
        }
    }

    #[test]
    fn renders_counts_and_fingerprints() {
        let out = render(&snapshot(), None);
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines[0], "TABLE         ROWS  FINGERPRINT");
        assert_eq!(lines[1], "projects        12  beef");
        assert_eq!(
            lines[2],
            "team_members     -  unknown (no such table: team_members)"
        );
        assert!(out.ends_with("No saved state to compare against.\n"));
    }

    #[test]
    fn reports_comparison_with_saved_state() {
        let unchanged = render(&snapshot(), Some(&[][..]));
        assert!(unchanged.ends_with("Matches saved state.\n"));

        let changed = vec!["projects".to_string()];
        let differs = render(&snapshot(), Some(changed.as_slice()));
        assert!(differs.ends_with("Differs from saved state: projects\n"));
    }
}
