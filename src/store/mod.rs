//! Context store: persistence of module decisions across runs.
//!
//! The context file is a YAML document with three sections, all optional:
//!
//! ```yaml
//! mappings:
//!   waffle: django-waffle
//! ignored:
//! - legacy
//! extra:
//! - plugins: acme-loader
//! - tasks
//! ```
//!
//! An `extra` entry carries the package its module was settled to; a bare
//! module name is settled again on the next run.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::InspectError;
use crate::ports::FileSystem;

/// Default context file name, placed in the codebase root.
pub const DEFAULT_CONTEXT_FILE: &str = ".packages-inspector.yaml";

const HEADER: &str = "# Module decisions recorded by packages-inspector. Safe to edit by hand.\n";

/// Decisions that survive between runs.
///
/// A module name appears in at most one of the three sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContextRecord {
    /// Confirmed module to package mappings.
    #[serde(default)]
    pub mappings: BTreeMap<String, String>,
    /// Modules left out of the audit.
    #[serde(default)]
    pub ignored: BTreeSet<String>,
    /// Modules required even though no import of them is found, with the
    /// package each one is settled to.
    #[serde(default, serialize_with = "write_extra", deserialize_with = "read_extra")]
    pub extra: BTreeMap<String, Option<String>>,
}

impl ContextRecord {
    /// Returns `true` when no decision is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty() && self.ignored.is_empty() && self.extra.is_empty()
    }

    /// Checks names and the disjointness of the three sections.
    ///
    /// # Errors
    ///
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        let modules = self
            .mappings
            .keys()
            .map(|m| ("mappings", m))
            .chain(self.ignored.iter().map(|m| ("ignored", m)))
            .chain(self.extra.keys().map(|m| ("extra", m)));
        for (section, module) in modules {
            if !is_module_name(module) {
                return Err(format!("{section}: {module:?} is not a top-level module name"));
            }
        }
        let packages = self
            .mappings
            .iter()
            .map(|(m, p)| ("mappings", m, p))
            .chain(self.extra.iter().filter_map(|(m, p)| Some(("extra", m, p.as_ref()?))));
        for (section, module, package) in packages {
            if package.trim().is_empty() || package.contains(char::is_whitespace) {
                return Err(format!("{section}: {module} maps to invalid package {package:?}"));
            }
        }

        let overlaps = [
            ("mappings", "ignored", self.mappings.keys().find(|m| self.ignored.contains(*m))),
            ("mappings", "extra", self.mappings.keys().find(|m| self.extra.contains_key(*m))),
            ("ignored", "extra", self.ignored.iter().find(|m| self.extra.contains_key(*m))),
        ];
        for (a, b, module) in overlaps {
            if let Some(module) = module {
                return Err(format!("module {module} is listed in both {a} and {b}"));
            }
        }
        Ok(())
    }
}

/// One item of the `extra` list: `module` or `module: package`.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ExtraEntry {
    Module(String),
    Settled(BTreeMap<String, String>),
}

fn write_extra<S: Serializer>(
    extra: &BTreeMap<String, Option<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let entries: Vec<ExtraEntry> = extra
        .iter()
        .map(|(module, package)| match package {
            Some(package) => {
                ExtraEntry::Settled(BTreeMap::from([(module.clone(), package.clone())]))
            }
            None => ExtraEntry::Module(module.clone()),
        })
        .collect();
    entries.serialize(serializer)
}

fn read_extra<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<String, Option<String>>, D::Error> {
    let mut extra = BTreeMap::new();
    for entry in Vec::<ExtraEntry>::deserialize(deserializer)? {
        match entry {
            ExtraEntry::Module(module) => {
                extra.insert(module, None);
            }
            ExtraEntry::Settled(pairs) if pairs.len() == 1 => {
                extra.extend(pairs.into_iter().map(|(module, package)| (module, Some(package))));
            }
            ExtraEntry::Settled(_) => {
                return Err(serde::de::Error::custom("an extra entry names exactly one module"));
            }
        }
    }
    Ok(extra)
}

fn is_module_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('.') && !name.contains(char::is_whitespace)
}

/// Loads and saves the [`ContextRecord`] through the `FileSystem` port.
pub struct ContextStore<'a> {
    fs: &'a dyn FileSystem,
    path: PathBuf,
    persist: bool,
}

impl<'a> ContextStore<'a> {
    /// Creates a store for the context file at `path`. When `persist` is
    /// `false`, [`ContextStore::save`] does nothing.
    #[must_use]
    pub fn new(fs: &'a dyn FileSystem, path: &Path, persist: bool) -> Self {
        Self { fs, path: path.to_path_buf(), persist }
    }

    /// Loads the record, or an empty one when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`InspectError::ContextValidation`] if the file is not a
    /// valid record, and [`InspectError::ContextIo`] if it cannot be read.
    pub fn load(&self) -> Result<ContextRecord, InspectError> {
        if !self.fs.exists(&self.path) {
            tracing::debug!("no context file at {}", self.path.display());
            return Ok(ContextRecord::default());
        }

        let text = self.fs.read_to_string(&self.path).map_err(|e| InspectError::ContextIo {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        if text.lines().all(|l| l.trim().is_empty() || l.trim_start().starts_with('#')) {
            return Ok(ContextRecord::default());
        }

        let record: ContextRecord =
            serde_yaml::from_str(&text).map_err(|e| self.invalid(e.to_string()))?;
        record.validate().map_err(|reason| self.invalid(reason))?;
        tracing::debug!(?record, "context loaded");
        Ok(record)
    }

    /// Writes the record atomically: the document goes to a temporary file
    /// next to the target, which then replaces it. Returns whether anything
    /// was written.
    ///
    /// # Errors
    ///
    /// Returns [`InspectError::ContextIo`] if the record cannot be written;
    /// the previous file is left untouched.
    pub fn save(&self, record: &ContextRecord) -> Result<bool, InspectError> {
        if !self.persist {
            tracing::debug!("context persistence disabled");
            return Ok(false);
        }

        let yaml = serde_yaml::to_string(record).map_err(|e| self.io_error(e.to_string()))?;
        write_atomic(self.fs, &self.path, &format!("{HEADER}{yaml}"))
            .map_err(|e| self.io_error(e.to_string()))?;
        tracing::debug!("context saved to {}", self.path.display());
        Ok(true)
    }

    fn invalid(&self, reason: String) -> InspectError {
        InspectError::ContextValidation { path: self.path.clone(), reason }
    }

    fn io_error(&self, reason: String) -> InspectError {
        InspectError::ContextIo { path: self.path.clone(), reason }
    }
}

/// Replaces `path` with `contents` through a temporary sibling file, so a
/// failed write never leaves a truncated target behind.
///
/// # Errors
///
/// Returns the underlying filesystem error; the temporary file is removed.
pub fn write_atomic(
    fs: &dyn FileSystem,
    path: &Path,
    contents: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or(DEFAULT_CONTEXT_FILE);
    let tmp = path.with_file_name(format!(".{name}.{}.tmp", uuid::Uuid::new_v4().simple()));

    let result = fs.write(&tmp, contents).and_then(|()| fs.rename(&tmp, path));
    if result.is_err() {
        let _ = fs.remove_file(&tmp);
    }
    result
}
