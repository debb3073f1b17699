//! `rebuild-monitor watch` command.

use std::sync::Arc;

use tracing::{error, info};

use crate::config::MonitorConfig;
use crate::context::ServiceContext;
use crate::monitor::Monitor;
use crate::{logging, preflight, scheduler};

/// Execute the `watch` command.
///
/// Polls until SIGINT or SIGTERM, then returns `Ok` so the process exits 0.
/// A rebuild still running at that point is not waited for.
///
/// # Errors
///
/// Returns an error string if logging, start-up checks or the runtime
/// cannot be set up.
pub fn run(ctx: &ServiceContext, config: &MonitorConfig) -> Result<(), String> {
    logging::init(Some(&config.log_file))?;
    preflight::run(ctx, config).map_err(|e| {
        error!("Start-up check failed: {e}");
        e
    })?;

    info!(
        "Watching {} every {}s for changes in: {}",
        config.database_path.display(),
        config.poll_interval_secs,
        config.tables.join(", ")
    );
    info!(
        "Rebuild command: {} (min interval {}s)",
        config.rebuild_command, config.min_rebuild_interval_secs
    );

    let monitor = Arc::new(Monitor::new(ctx, config));
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start runtime: {e}"))?;

    let completed = runtime.block_on(scheduler::run_until(
        monitor,
        config.poll_interval(),
        scheduler::shutdown_signal(),
    ));
    runtime.shutdown_background();

    info!("Database monitor stopped after {completed} cycle(s)");
    Ok(())
}
