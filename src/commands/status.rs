//! `rebuild-monitor status` command.

use std::fmt::Write as _;
use std::sync::Arc;

use crate::config::MonitorConfig;
use crate::context::ServiceContext;
use crate::fingerprint::Fingerprint;
use crate::state::{MonitorState, StateStore};

/// Digest characters shown per table.
const DIGEST_PREFIX: usize = 12;

/// Execute the `status` command.
///
/// Prints the persisted fingerprint of every configured table and the time
/// of the last successful rebuild.
///
/// # Errors
///
/// Returns an error string if the state file exists but cannot be read.
pub fn run(ctx: &ServiceContext, config: &MonitorConfig) -> Result<(), String> {
    let store = StateStore::new(Arc::clone(&ctx.fs), &config.state_file);
    let state = store.load().map_err(|e| e.to_string())?;
    match state {
        Some(state) => print!("{}", render(&state, &config.tables)),
        None => println!("No state recorded at {}.", config.state_file.display()),
    }
    Ok(())
}

/// Renders the status table.
#[must_use]
pub fn render(state: &MonitorState, tables: &[String]) -> String {
    let rows: Vec<(&str, String)> = tables
        .iter()
        .map(|table| {
            let shown = match state.checksums.get(table) {
                Some(Fingerprint::Known(digest)) => digest.chars().take(DIGEST_PREFIX).collect(),
                Some(Fingerprint::Unknown(_)) => "(unreadable)".to_string(),
                None => "(not recorded)".to_string(),
            };
            (table.as_str(), shown)
        })
        .collect();

    let table_width = rows.iter().map(|r| r.0.len()).max().unwrap_or(5).max(5);
    let fp_width = rows.iter().map(|r| r.1.len()).max().unwrap_or(11).max(11);

    let mut out = String::new();
    let header = format!("{:<table_width$}  {:<fp_width$}", "TABLE", "FINGERPRINT");
    let _ = writeln!(out, "{header}");
    let _ = writeln!(out, "{:-<table_width$}  {:-<fp_width$}", "", "");
    for (table, shown) in &rows {
        let _ = writeln!(out, "{table:<table_width$}  {shown:<fp_width$}");
    }
    let last = state
        .last_rebuild
        .map_or_else(|| "never".to_string(), |t| t.to_rfc3339());
    let _ = writeln!(out, "\nLast rebuild: {last}");
    out
}
