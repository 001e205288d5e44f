//! Filesystem port for file I/O and tree traversal.

use std::path::{Path, PathBuf};

/// One entry produced by [`FileSystem::walk`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    /// Full path of the entry.
    pub path: PathBuf,
    /// Whether the entry is a directory.
    pub is_dir: bool,
}

/// Provides filesystem access for reading, writing and walking files.
///
/// Abstracting the filesystem lets the whole pipeline run against an
/// in-memory tree in tests.
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

    /// Moves `from` over `to`, replacing `to` if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is missing or the move fails.
    fn rename(
        &self,
        from: &Path,
        to: &Path,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Deletes a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be removed.
    fn remove_file(&self, path: &Path) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Returns `true` if the path exists on the filesystem.
    fn exists(&self, path: &Path) -> bool;

    /// Recursively lists `root` (included), never descending into
    /// directories whose name is in `skip_dirs`.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` cannot be read.
    fn walk(
        &self,
        root: &Path,
        skip_dirs: &[&str],
    ) -> Result<Vec<WalkEntry>, Box<dyn std::error::Error + Send + Sync>>;
}
