//! Declared dependencies: parsing `requirements.txt` and `Pipfile` files
//! into the package set and the hint keys used to match module names.

pub mod apply;

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{InspectError, Warning, Warnings};
use crate::ports::FileSystem;

/// Kind of declarations file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationsFormat {
    /// pip `requirements.txt` syntax.
    Requirements,
    /// Pipenv `Pipfile` (TOML).
    Pipfile,
}

/// Where the declared dependencies come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationsSource {
    /// Path of the declarations file.
    pub path: PathBuf,
    /// Its syntax.
    pub format: DeclarationsFormat,
}

/// A package that a hint key points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hint {
    /// Declared package name, as written.
    pub package: String,
    /// `false` for the package's full key, `true` for a shortened key.
    pub derived: bool,
}

/// Declared packages plus the hint keys derived from their names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Declarations {
    packages: BTreeSet<String>,
    hints: BTreeMap<String, Hint>,
}

/// Normalizes a module or package name for comparison: lower-case with
/// `-`, `_` and `.` removed.
#[must_use]
pub fn normalize_key(name: &str) -> String {
    name.chars().filter(|c| !matches!(c, '-' | '_' | '.')).flat_map(char::to_lowercase).collect()
}

/// First segments of packages that plug into a tool instead of providing
/// the module named by the rest (`types-requests`, `pytest-django`).
const TOOL_PREFIXES: &[&str] = &["types", "pytest", "flake8", "mypy", "pylint", "sphinxcontrib"];

/// Shortened keys a package is also known by: the name without its first
/// segment (`django-waffle` -> `waffle`) and without a `py` prefix
/// (`PyYAML` -> `yaml`).
fn derived_keys(package: &str) -> Vec<String> {
    let mut keys = Vec::new();
    let segments: Vec<&str> = package.split(['-', '_', '.']).filter(|s| !s.is_empty()).collect();
    let tool_plugin = segments
        .first()
        .is_some_and(|first| TOOL_PREFIXES.contains(&first.to_lowercase().as_str()));
    if segments.len() > 1 && !tool_plugin {
        keys.push(normalize_key(&segments[1..].concat()));
    }
    let full = normalize_key(package);
    if let Some(rest) = full.strip_prefix("py") {
        if !rest.is_empty() {
            keys.push(rest.to_string());
        }
    }
    keys.retain(|k| *k != full);
    keys
}

impl Declarations {
    /// Builds declarations from package names.
    pub fn from_packages<S: AsRef<str>>(packages: impl IntoIterator<Item = S>) -> Self {
        let packages: BTreeSet<String> =
            packages.into_iter().map(|p| p.as_ref().to_string()).collect();
        let mut hints: BTreeMap<String, Hint> = BTreeMap::new();

        for package in &packages {
            hints.insert(normalize_key(package), Hint { package: package.clone(), derived: false });
        }
        // Iterating in name order keeps the alphabetically first package
        // on colliding derived keys.
        for package in &packages {
            for key in derived_keys(package) {
                hints
                    .entry(key)
                    .or_insert_with(|| Hint { package: package.clone(), derived: true });
            }
        }

        Self { packages, hints }
    }

    /// Loads declarations from `source`; no source, or a missing file,
    /// yields empty declarations.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn load(
        fs: &dyn FileSystem,
        source: Option<&DeclarationsSource>,
        warnings: &mut Warnings,
    ) -> Result<Self, InspectError> {
        let Some(source) = source else {
            return Ok(Self::default());
        };
        if !fs.exists(&source.path) {
            tracing::info!("no declarations file at {}, assuming none", source.path.display());
            return Ok(Self::default());
        }

        let text = fs.read_to_string(&source.path).map_err(|e| InspectError::Declarations {
            path: source.path.clone(),
            reason: e.to_string(),
        })?;
        let names = match source.format {
            DeclarationsFormat::Requirements => parse_requirements(&text, warnings),
            DeclarationsFormat::Pipfile => parse_pipfile(&text, warnings),
        };
        let declarations = Self::from_packages(names);
        tracing::debug!(packages = ?declarations.packages, "declared packages");
        Ok(declarations)
    }

    /// Declared package names, as written.
    #[must_use]
    pub fn packages(&self) -> &BTreeSet<String> {
        &self.packages
    }

    /// The declared package whose hint key equals the normalized `module`.
    #[must_use]
    pub fn hint_for(&self, module: &str) -> Option<&Hint> {
        self.hints.get(&normalize_key(module))
    }

    /// The declared spelling of `package`, compared by normalized key.
    #[must_use]
    pub fn declared_name(&self, package: &str) -> Option<&str> {
        let key = normalize_key(package);
        self.packages.iter().find(|p| normalize_key(p) == key).map(String::as_str)
    }

    /// Returns `true` if `package` is declared, ignoring case and separators.
    #[must_use]
    pub fn is_declared(&self, package: &str) -> bool {
        self.declared_name(package).is_some()
    }
}

fn requirement_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"^([A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?)",
            r"\s*(?:\[[^\]]*\])?",
            r"\s*(?:(?:[<>=!~]|@).*)?$",
        ))
        .expect("requirement regex is valid")
    })
}

/// Extracts the package name of one requirements line.
///
/// `Ok(None)` for lines carrying no requirement (blank, comment, option),
/// `Err(())` for lines that cannot be understood.
fn parse_requirement_line(raw: &str) -> Result<Option<String>, ()> {
    let mut line = raw.trim();
    if line.is_empty() || line.starts_with('#') || line.starts_with('-') {
        return Ok(None);
    }
    if let Some(idx) = line.find(" #").or_else(|| line.find("\t#")) {
        line = &line[..idx];
    }
    if let Some((spec, _marker)) = line.split_once(';') {
        line = spec;
    }
    let line = line.trim_end_matches('\\').trim();

    requirement_regex()
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|name| Some(name.as_str().to_string()))
        .ok_or(())
}

/// Parses pip requirements text into package names, in file order.
/// Unrecognized lines are reported and skipped.
pub fn parse_requirements(text: &str, warnings: &mut Warnings) -> Vec<String> {
    let mut names = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        match parse_requirement_line(raw) {
            Ok(Some(name)) => names.push(name),
            Ok(None) => {}
            Err(()) => warnings.push(Warning::Declaration {
                line: idx + 1,
                content: raw.trim().to_string(),
            }),
        }
    }
    names
}

/// Parses the `[packages]` table of a Pipfile into package names.
/// A malformed document is reported once and yields no packages.
pub fn parse_pipfile(text: &str, warnings: &mut Warnings) -> Vec<String> {
    let parsed: toml::Value = match toml::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            warnings.push(Warning::Declaration {
                line: 0,
                content: format!("invalid Pipfile: {e}"),
            });
            return Vec::new();
        }
    };
    parsed
        .get("packages")
        .and_then(toml::Value::as_table)
        .map(|packages| packages.keys().cloned().collect())
        .unwrap_or_default()
}
