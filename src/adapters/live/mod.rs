//! Live adapters for real external interactions.

pub mod builder;
pub mod clock;
pub mod filesystem;
pub mod shell;
pub mod sqlite;

pub use builder::ShellBuilder;
pub use clock::LiveClock;
pub use filesystem::LiveFileSystem;
pub use shell::LiveShellExecutor;
pub use sqlite::SqliteStore;
