//! Filesystem port for the state file and start-up directory checks.

use std::path::Path;

/// Provides filesystem access for reading and writing files.
///
/// The state store goes through this trait so cycle logic can be tested
/// against an in-memory filesystem.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or is not valid UTF-8.
    fn read_to_string(
        &self,
        path: &Path,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;

    /// Writes the given contents to a file, creating or overwriting it.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails (permissions, disk full, etc.).
    fn write(
        &self,
        path: &Path,
        contents: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Returns `true` if the path exists on the filesystem.
    fn exists(&self, path: &Path) -> bool;

    /// Creates a directory and all missing parents.
    ///
    /// # Errors
    ///
    /// Returns an error if any component cannot be created.
    fn create_dir_all(&self, path: &Path) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
