//! Drift between the packages a codebase needs and the ones it declares.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use crate::declarations::{normalize_key, Declarations};

/// Packages to add and packages to remove.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffResult {
    /// Required but not declared.
    pub missing: BTreeSet<String>,
    /// Declared but not required.
    pub unused: BTreeSet<String>,
}

impl DiffResult {
    /// Returns `true` when either set is non-empty.
    #[must_use]
    pub fn has_drift(&self) -> bool {
        !self.missing.is_empty() || !self.unused.is_empty()
    }
}

/// Inputs that widen what counts as required or kept.
#[derive(Debug, Clone, Default)]
pub struct DiffOptions {
    /// Packages required regardless of imports (`--extra-package`).
    pub extra_packages: BTreeSet<String>,
    /// Packages never reported unused (`--keep-package`).
    pub keep_packages: BTreeSet<String>,
    /// Modules both imported and defined locally.
    pub shadowed: BTreeSet<String>,
}

/// Compares `required` against `declared`.
///
/// Names are compared through [`normalize_key`], so `PyYAML` and `pyyaml`
/// are the same package. Missing names keep the spelling of `required`,
/// unused names the spelling of `declared`.
#[must_use]
pub fn check(
    required: &BTreeSet<String>,
    declared: &Declarations,
    options: &DiffOptions,
) -> DiffResult {
    let required: BTreeSet<&String> = required.iter().chain(&options.extra_packages).collect();
    let required_keys: BTreeSet<String> = required.iter().map(|p| normalize_key(p)).collect();
    let keep_keys: BTreeSet<String> =
        options.keep_packages.iter().map(|p| normalize_key(p)).collect();
    let shadowed_packages: BTreeSet<String> = options
        .shadowed
        .iter()
        .filter_map(|module| declared.hint_for(module))
        .map(|hint| normalize_key(&hint.package))
        .collect();

    let missing = required
        .into_iter()
        .filter(|p| !declared.is_declared(p))
        .cloned()
        .collect();
    let unused = declared
        .packages()
        .iter()
        .filter(|p| {
            let key = normalize_key(p);
            !required_keys.contains(&key)
                && !keep_keys.contains(&key)
                && !shadowed_packages.contains(&key)
        })
        .cloned()
        .collect();

    let diff = DiffResult { missing, unused };
    tracing::debug!(?diff, "diff");
    diff
}

/// Renders the report printed at the end of a run.
///
/// Without a declarations file every required package is listed under
/// "Dependencies" instead of "Potential missing packages".
#[must_use]
pub fn format_report(diff: &DiffResult, has_declarations: bool) -> String {
    let mut out = String::new();
    if !diff.missing.is_empty() {
        let title = if has_declarations { "Potential missing packages" } else { "Dependencies" };
        let _ = writeln!(out, "\n{title}:\n");
        for package in &diff.missing {
            let _ = writeln!(out, "{package}");
        }
    }
    if !diff.unused.is_empty() {
        let _ = writeln!(out, "\nUnused packages:\n");
        for package in &diff.unused {
            let _ = writeln!(out, "{package}");
        }
    }
    if !diff.has_drift() {
        out.push_str("\nAll good\n");
    }
    out
}
