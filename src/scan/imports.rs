//! Extraction of imported module names from Python source text.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

fn import_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^import\s+(.+)$").expect("import regex is valid"))
}

fn from_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^from\s+(\.*)\s*([\w.]*)\s+import\b").expect("from regex is valid")
    })
}

/// Returns the distinct top-level module names imported by `source`.
///
/// Handles `import a.b as c, d` and `from a.b import x` statements at any
/// indentation, `;`-separated statements and backslash continuations.
/// Relative imports, comments and triple-quoted strings are ignored.
#[must_use]
pub fn extract_imports(source: &str) -> BTreeSet<String> {
    let mut modules = BTreeSet::new();
    for statement in logical_lines(source) {
        for part in statement.split(';') {
            collect_statement(part.trim(), &mut modules);
        }
    }
    modules
}

fn collect_statement(statement: &str, modules: &mut BTreeSet<String>) {
    if let Some(caps) = from_regex().captures(statement) {
        let dots = caps.get(1).map_or("", |m| m.as_str());
        let module = caps.get(2).map_or("", |m| m.as_str());
        if dots.is_empty() {
            push_top_level(module, modules);
        }
        return;
    }
    if let Some(caps) = import_regex().captures(statement) {
        let names = caps.get(1).map_or("", |m| m.as_str());
        for item in names.trim_matches(|c| c == '(' || c == ')').split(',') {
            let name = item.split_whitespace().next().unwrap_or("");
            push_top_level(name, modules);
        }
    }
}

fn push_top_level(dotted: &str, modules: &mut BTreeSet<String>) {
    let top = dotted.split('.').next().unwrap_or("");
    if !top.is_empty() && top.chars().all(|c| c.is_alphanumeric() || c == '_') {
        modules.insert(top.to_string());
    }
}

/// Splits source into logical lines with comments and string literals
/// blanked out and backslash continuations joined.
fn logical_lines(source: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut triple: Option<&str> = None;

    for raw in source.lines() {
        let mut line = String::new();
        let mut rest = raw;
        while !rest.is_empty() {
            if let Some(quote) = triple {
                match rest.find(quote) {
                    Some(end) => {
                        rest = &rest[end + quote.len()..];
                        triple = None;
                    }
                    None => rest = "",
                }
                continue;
            }
            if rest.starts_with("\"\"\"") || rest.starts_with("'''") {
                triple = Some(&rest[..3]);
                rest = &rest[3..];
                // Keep a placeholder so a docstring is never mistaken for code.
                line.push_str("\"\"");
                continue;
            }
            let mut chars = rest.chars();
            let Some(c) = chars.next() else { break };
            match c {
                '#' => break,
                '"' | '\'' => {
                    let end = skip_string(rest, c);
                    line.push_str("\"\"");
                    rest = &rest[end..];
                }
                _ => {
                    line.push(c);
                    rest = chars.as_str();
                }
            }
        }

        if triple.is_some() && line.trim().is_empty() && current.is_empty() {
            continue;
        }
        if let Some(stripped) = line.trim_end().strip_suffix('\\') {
            current.push_str(stripped);
            current.push(' ');
            continue;
        }
        current.push_str(&line);
        lines.push(std::mem::take(&mut current).trim().to_string());
    }
    if !current.is_empty() {
        lines.push(current.trim().to_string());
    }
    lines
}

/// Byte offset just past the single-quoted string starting at `s[0]`.
fn skip_string(s: &str, quote: char) -> usize {
    let mut escaped = false;
    for (i, c) in s.char_indices().skip(1) {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return i + c.len_utf8();
        }
    }
    s.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(source: &str) -> Vec<String> {
        extract_imports(source).into_iter().collect()
    }

    #[test]
    fn plain_and_dotted_imports() {
        let src = "import os\nimport django.conf as conf, requests\nfrom yaml import safe_load\n";
        assert_eq!(names(src), vec!["django", "os", "requests", "yaml"]);
    }

    #[test]
    fn relative_imports_are_skipped() {
        let src = "from . import models\nfrom .utils import x\nfrom ..pkg.mod import y\n";
        assert!(names(src).is_empty());
    }

    #[test]
    fn nested_and_semicolon_statements() {
        let src = "\
def f():
    try:
        import ujson as json; import six
    except ImportError:
        import json
";
        assert_eq!(names(src), vec!["json", "six", "ujson"]);
    }

    #[test]
    fn continuation_lines_are_joined() {
        let src = "import requests, \\\n    urllib3\n";
        assert_eq!(names(src), vec!["requests", "urllib3"]);
    }

    #[test]
    fn parenthesized_from_import_keeps_module() {
        let src = "from celery.schedules import (\n    crontab,\n    solar,\n)\n";
        assert_eq!(names(src), vec!["celery"]);
    }

    #[test]
    fn comments_and_strings_are_ignored() {
        let src = r#"
# import fake_comment
"""
import fake_docstring
"""
x = "import fake_string"
y = 'from fake_single import z'
import real  # import fake_trailing
"#;
        assert_eq!(names(src), vec!["real"]);
    }

    #[test]
    fn single_line_docstring_then_import() {
        let src = "'''Module doc.'''\nimport requests\n";
        assert_eq!(names(src), vec!["requests"]);
    }

    #[test]
    fn importlib_calls_are_not_imports() {
        let src = "importlib.import_module('plugins')\nimported = 1\n";
        assert!(names(src).is_empty());
    }
}
