//! Service context bundling all port trait objects.

use std::sync::Arc;

use crate::adapters::live::{
    LiveClock, LiveFileSystem, LiveShellExecutor, ShellBuilder, SqliteStore,
};
use crate::config::MonitorConfig;
use crate::ports::builder::Builder;
use crate::ports::clock::Clock;
use crate::ports::filesystem::FileSystem;
use crate::ports::shell::{ShellExecutor, ShellRequest};
use crate::ports::store::DataStore;

/// Bundles all port trait objects into a single context.
///
/// Each field provides access to one external boundary. Ports are
/// reference-counted because the monitor runs its cycles on a worker thread
/// while the context stays with the command that built it.
pub struct ServiceContext {
    /// Clock for debounce decisions and rebuild timestamps.
    pub clock: Arc<dyn Clock>,
    /// Filesystem holding the state file.
    pub fs: Arc<dyn FileSystem>,
    /// Shell used for start-up checks and by the live builder.
    pub shell: Arc<dyn ShellExecutor>,
    /// The monitored database.
    pub store: Arc<dyn DataStore>,
    /// The rebuild capability.
    pub builder: Arc<dyn Builder>,
}

impl ServiceContext {
    /// Creates a live context: system clock, real disk, `sh`, the configured
    /// SQLite file and the configured rebuild command.
    #[must_use]
    pub fn live(config: &MonitorConfig) -> Self {
        let shell: Arc<dyn ShellExecutor> = Arc::new(LiveShellExecutor);
        let request = ShellRequest {
            command: config.rebuild_command.clone(),
            workdir: config.rebuild_workdir.clone(),
            max_output_bytes: config.max_output_bytes,
            timeout: config.rebuild_timeout(),
        };

        Self {
            clock: Arc::new(LiveClock),
            fs: Arc::new(LiveFileSystem),
            builder: Arc::new(ShellBuilder::new(Arc::clone(&shell), request)),
            shell,
            store: Arc::new(SqliteStore::new(&config.database_path)),
        }
    }
}
