//! Rewriting a requirements file to match the audit result.

use std::collections::BTreeSet;

use super::{normalize_key, parse_requirement_line};

/// Returns `text` with requirement lines for `unused` packages removed and
/// one line per `missing` package appended.
#[must_use]
pub fn rewrite_requirements(
    text: &str,
    missing: &BTreeSet<String>,
    unused: &BTreeSet<String>,
) -> String {
    let unused_keys: BTreeSet<String> = unused.iter().map(|p| normalize_key(p)).collect();

    let mut lines: Vec<&str> = Vec::new();
    let mut dropping_continuation = false;
    for line in text.lines() {
        if dropping_continuation {
            dropping_continuation = line.trim_end().ends_with('\\');
            continue;
        }
        let drop = matches!(
            parse_requirement_line(line),
            Ok(Some(ref name)) if unused_keys.contains(&normalize_key(name))
        );
        if drop {
            dropping_continuation = line.trim_end().ends_with('\\');
            continue;
        }
        lines.push(line);
    }

    let mut out = lines.join("\n");
    if !out.is_empty() && !missing.is_empty() {
        out.push('\n');
    }
    out.push_str(&missing.iter().cloned().collect::<Vec<_>>().join("\n"));
    if !out.is_empty() {
        out.push('\n');
    }
    out
}
