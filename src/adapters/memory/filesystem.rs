//! In-memory `FileSystem` adapter.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::ports::filesystem::{FileSystem, WalkEntry};

/// Filesystem held in memory; directories are implied by file paths.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: Mutex<BTreeMap<PathBuf, String>>,
    fail_writes: Mutex<bool>,
}

impl MemoryFileSystem {
    /// Creates an empty filesystem.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a filesystem holding the given `(path, contents)` files.
    pub fn with_files<P: AsRef<Path>>(files: impl IntoIterator<Item = (P, &'static str)>) -> Self {
        let fs = Self::new();
        for (path, contents) in files {
            fs.insert(path, contents);
        }
        fs
    }

    fn files(&self) -> MutexGuard<'_, BTreeMap<PathBuf, String>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds or replaces a file.
    pub fn insert(&self, path: impl AsRef<Path>, contents: &str) {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.as_ref().to_path_buf(), contents.to_string());
    }

    /// Returns a file's contents, if present.
    #[must_use]
    pub fn get(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files().get(path.as_ref()).cloned()
    }

    /// All file paths currently stored.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files().keys().cloned().collect()
    }

    /// Makes every subsequent `write` fail.
    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap_or_else(PoisonError::into_inner) = fail;
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_to_string(
        &self,
        path: &Path,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        self.get(path).ok_or_else(|| format!("File not found: {}", path.display()).into())
    }

    fn write(
        &self,
        path: &Path,
        contents: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if *self.fail_writes.lock().unwrap_or_else(PoisonError::into_inner) {
            return Err(format!("write refused: {}", path.display()).into());
        }
        self.insert(path, contents);
        Ok(())
    }

    fn rename(
        &self,
        from: &Path,
        to: &Path,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut files = self.files();
        let contents =
            files.remove(from).ok_or_else(|| format!("File not found: {}", from.display()))?;
        files.insert(to.to_path_buf(), contents);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| format!("File not found: {}", path.display()).into())
    }

    fn exists(&self, path: &Path) -> bool {
        let files = self.files();
        files.contains_key(path) || files.keys().any(|k| k.starts_with(path) && k != path)
    }

    fn walk(
        &self,
        root: &Path,
        skip_dirs: &[&str],
    ) -> Result<Vec<WalkEntry>, Box<dyn std::error::Error + Send + Sync>> {
        let files = self.files();
        if !files.keys().any(|k| k.starts_with(root) && k != root) {
            return Err(format!("{} is not a directory", root.display()).into());
        }

        let skipped = |path: &Path| {
            path.strip_prefix(root).is_ok_and(|rel| {
                rel.parent().is_some_and(|dir| {
                    dir.components()
                        .any(|c| c.as_os_str().to_str().is_some_and(|n| skip_dirs.contains(&n)))
                })
            })
        };

        let mut dirs = BTreeSet::new();
        let mut entries = Vec::new();
        for path in files.keys().filter(|k| k.starts_with(root) && !skipped(k)) {
            let mut dir = path.parent();
            while let Some(d) = dir {
                if !d.starts_with(root) {
                    break;
                }
                dirs.insert(d.to_path_buf());
                dir = d.parent();
            }
            entries.push(WalkEntry { path: path.clone(), is_dir: false });
        }
        entries.extend(dirs.into_iter().map(|path| WalkEntry { path, is_dir: true }));
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_lists_files_and_implied_directories() {
        let fs = MemoryFileSystem::with_files([
            ("/repo/app/main.py", ""),
            ("/repo/venv/lib/six.py", ""),
            ("/other/x.py", ""),
        ]);
        let entries = fs.walk(Path::new("/repo"), &["venv"]).unwrap();
        let paths: Vec<&Path> = entries.iter().map(|e| e.path.as_path()).collect();
        assert_eq!(
            paths,
            vec![Path::new("/repo"), Path::new("/repo/app"), Path::new("/repo/app/main.py")]
        );
        assert!(entries[0].is_dir);
        assert!(!entries[2].is_dir);
    }

    #[test]
    fn rename_moves_contents() {
        let fs = MemoryFileSystem::with_files([("/a.tmp", "new"), ("/a", "old")]);
        fs.rename(Path::new("/a.tmp"), Path::new("/a")).unwrap();
        assert_eq!(fs.get("/a").as_deref(), Some("new"));
        assert!(!fs.exists(Path::new("/a.tmp")));
    }

    #[test]
    fn failing_writes_leave_files_untouched() {
        let fs = MemoryFileSystem::with_files([("/a", "old")]);
        fs.fail_writes(true);
        assert!(fs.write(Path::new("/a"), "new").is_err());
        assert_eq!(fs.get("/a").as_deref(), Some("old"));
    }
}
