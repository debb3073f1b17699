//! Port traits defining the monitor's external boundaries.
//!
//! Each trait stands between the polling core and something it does not
//! control: wall-clock time, the filesystem holding the state file, the
//! shell that runs the rebuild, the monitored database and the rebuild
//! itself. Implementations live in `src/adapters/`.

pub mod builder;
pub mod clock;
pub mod filesystem;
pub mod shell;
pub mod store;

pub use builder::{BuildReport, Builder};
pub use clock::Clock;
pub use filesystem::FileSystem;
pub use shell::{ShellExecutor, ShellOutput, ShellRequest};
pub use store::{DataStore, StoreConnection, TableRows};
