//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI parser for `rebuild-monitor`.
#[derive(Debug, Parser)]
#[command(
    name = "rebuild-monitor",
    version,
    about = "Watch SQLite tables and rebuild the site when their content changes"
)]
pub struct Cli {
    /// Configuration overrides shared by every command.
    #[command(flatten)]
    pub config: ConfigArgs,
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Poll the database until interrupted, rebuilding on change.
    Watch,
    /// Run a single poll cycle and report what it did.
    Once,
    /// Show the persisted checksums and last rebuild time.
    Status,
    /// Run start-up checks and print current table fingerprints without saving them.
    Check,
}

/// Flags that override configuration file and environment values.
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigArgs {
    /// YAML configuration file.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// SQLite database to watch.
    #[arg(long, global = true, value_name = "PATH")]
    pub database: Option<PathBuf>,
    /// Seconds between poll cycles.
    #[arg(long, global = true, value_name = "SECS")]
    pub poll_interval: Option<u64>,
    /// Minimum seconds between rebuild starts.
    #[arg(long, global = true, value_name = "SECS")]
    pub min_rebuild_interval: Option<u64>,
    /// Shell command that rebuilds the site.
    #[arg(long = "command", global = true, value_name = "CMD")]
    pub rebuild_command: Option<String>,
    /// Working directory for the rebuild command.
    #[arg(long, global = true, value_name = "DIR")]
    pub workdir: Option<PathBuf>,
    /// Kill the rebuild command after this many seconds.
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,
    /// Per-stream cap on captured rebuild output.
    #[arg(long, global = true, value_name = "BYTES")]
    pub max_output_bytes: Option<usize>,
    /// JSON state file.
    #[arg(long, global = true, value_name = "PATH")]
    pub state_file: Option<PathBuf>,
    /// Append-only log file.
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
    /// Comma-separated list of tables to monitor.
    #[arg(long, global = true, value_name = "TABLES", value_delimiter = ',')]
    pub tables: Vec<String>,
}
