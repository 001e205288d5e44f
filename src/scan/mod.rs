//! Import scanning: which external modules does a codebase import?

pub mod imports;
pub mod stdlib;

use std::collections::BTreeSet;
use std::path::Path;

use crate::error::{InspectError, Warning, Warnings};
use crate::ports::FileSystem;

pub use imports::extract_imports;
pub use stdlib::is_stdlib;

/// Directories never descended into.
pub const SKIPPED_DIRS: &[&str] = &[
    ".hg",
    ".svn",
    ".git",
    ".mypy_cache",
    ".tox",
    "__pycache__",
    "env",
    "venv",
    ".venv",
    "node_modules",
];

/// Where an imported module comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleOrigin {
    /// Defined by a file or package of the codebase itself.
    Local,
    /// Shipped with the interpreter.
    StandardLibrary,
    /// Provided by a third-party package.
    External,
}

/// An imported top-level module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    /// Top-level import name.
    pub name: String,
    /// Classification of the name.
    pub origin: ModuleOrigin,
}

/// Outcome of scanning a codebase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    /// External modules imported anywhere in the tree.
    pub external: BTreeSet<String>,
    /// Imported names that are also defined locally (and not stdlib); a
    /// package of the same name may still be genuinely needed.
    pub shadowed: BTreeSet<String>,
    /// Number of source files read.
    pub files_scanned: usize,
}

/// Classifies `name` against the standard library and the local names.
#[must_use]
pub fn classify(name: &str, local_names: &BTreeSet<String>) -> ModuleOrigin {
    if is_stdlib(name) {
        ModuleOrigin::StandardLibrary
    } else if local_names.contains(name) {
        ModuleOrigin::Local
    } else {
        ModuleOrigin::External
    }
}

/// Walks a codebase and collects the modules it imports.
pub struct ImportScanner<'a> {
    fs: &'a dyn FileSystem,
}

impl<'a> ImportScanner<'a> {
    /// Creates a scanner reading through `fs`.
    #[must_use]
    pub fn new(fs: &'a dyn FileSystem) -> Self {
        Self { fs }
    }

    /// Scans every `.py` file under `root`. Unreadable files are recorded
    /// in `warnings` and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`InspectError::Scan`] if `root` cannot be walked.
    pub fn scan(&self, root: &Path, warnings: &mut Warnings) -> Result<ScanResult, InspectError> {
        let entries = self.fs.walk(root, SKIPPED_DIRS).map_err(|e| InspectError::Scan {
            path: root.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut local_names = BTreeSet::new();
        let mut imported = BTreeSet::new();
        let mut files_scanned = 0;

        for entry in &entries {
            if entry.is_dir {
                if let Some(name) = entry.path.file_name().and_then(|n| n.to_str()) {
                    local_names.insert(name.to_string());
                }
                continue;
            }
            if entry.path.extension().and_then(|e| e.to_str()) != Some("py") {
                continue;
            }
            if let Some(stem) = entry.path.file_stem().and_then(|n| n.to_str()) {
                local_names.insert(stem.to_string());
            }

            tracing::debug!("reading {}", entry.path.display());
            match self.fs.read_to_string(&entry.path) {
                Ok(source) => {
                    files_scanned += 1;
                    imported.extend(extract_imports(&source));
                }
                Err(e) => warnings.push(Warning::Scan {
                    path: entry.path.clone(),
                    reason: e.to_string(),
                }),
            }
        }

        let mut result = ScanResult { files_scanned, ..ScanResult::default() };
        for module in imported.into_iter().map(|name| {
            let origin = classify(&name, &local_names);
            Module { name, origin }
        }) {
            match module.origin {
                ModuleOrigin::External => {
                    result.external.insert(module.name);
                }
                ModuleOrigin::Local => {
                    result.shadowed.insert(module.name);
                }
                ModuleOrigin::StandardLibrary => {}
            }
        }

        tracing::debug!(external = ?result.external, shadowed = ?result.shadowed, "scan result");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryFileSystem;

    fn sample_project() -> MemoryFileSystem {
        MemoryFileSystem::with_files([
            ("/project/app/__init__.py", ""),
            (
                "/project/app/views.py",
                "import os\nimport requests\nfrom app import models\nfrom . import helpers\n",
            ),
            ("/project/app/models.py", "from django.db import models\nimport helpers\n"),
            ("/project/app/helpers.py", "import json\n"),
            ("/project/django/__init__.py", ""),
            ("/project/venv/lib/yaml.py", "import notscanned\n"),
            ("/project/README.md", "import markdown_is_not_python\n"),
        ])
    }

    #[test]
    fn external_modules_exclude_local_and_stdlib() {
        let fs = sample_project();
        let mut warnings = Warnings::new();
        let result = ImportScanner::new(&fs).scan(Path::new("/project"), &mut warnings).unwrap();

        assert_eq!(result.external.into_iter().collect::<Vec<_>>(), vec!["requests"]);
        assert_eq!(result.files_scanned, 5);
        assert!(warnings.is_empty());
    }

    #[test]
    fn locally_defined_imports_are_shadowed() {
        let fs = sample_project();
        let result =
            ImportScanner::new(&fs).scan(Path::new("/project"), &mut Warnings::new()).unwrap();

        assert!(result.shadowed.contains("django"));
        assert!(result.shadowed.contains("app"));
        assert!(result.shadowed.contains("helpers"));
        assert!(!result.shadowed.contains("json"));
    }

    #[test]
    fn scanning_twice_gives_the_same_set() {
        let fs = sample_project();
        let scanner = ImportScanner::new(&fs);
        let a = scanner.scan(Path::new("/project"), &mut Warnings::new()).unwrap();
        let b = scanner.scan(Path::new("/project"), &mut Warnings::new()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn missing_root_is_an_error() {
        let fs = MemoryFileSystem::new();
        let err = ImportScanner::new(&fs).scan(Path::new("/nowhere"), &mut Warnings::new());
        assert!(matches!(err, Err(InspectError::Scan { .. })));
    }

    #[test]
    fn classify_prefers_stdlib_over_local() {
        let locals = BTreeSet::from(["json".to_string(), "app".to_string()]);
        assert_eq!(classify("json", &locals), ModuleOrigin::StandardLibrary);
        assert_eq!(classify("app", &locals), ModuleOrigin::Local);
        assert_eq!(classify("requests", &locals), ModuleOrigin::External);
    }
}

#[cfg(test)]
mod live_tests {
    use super::*;
    use crate::adapters::live::filesystem::LiveFileSystem;

    #[test]
    fn invalid_utf8_file_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ok.py"), "import requests\n").unwrap();
        std::fs::write(dir.path().join("bad.py"), [0xff, 0xfe, 0x00]).unwrap();

        let mut warnings = Warnings::new();
        let result = ImportScanner::new(&LiveFileSystem).scan(dir.path(), &mut warnings).unwrap();

        assert!(result.external.contains("requests"));
        assert_eq!(warnings.items().len(), 1);
        assert!(matches!(
            &warnings.items()[0],
            Warning::Scan { path, .. } if path.ends_with("bad.py")
        ));
    }
}
