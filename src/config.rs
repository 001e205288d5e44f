//! Run configuration resolved from the command line and the environment.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::time::Duration;

use crate::adapters::live::package_index::DEFAULT_INDEX_URL;
use crate::cli::{parse_threshold, Cli};
use crate::declarations::{DeclarationsFormat, DeclarationsSource};
use crate::resolve::DEFAULT_SIMILARITY_THRESHOLD;
use crate::store::DEFAULT_CONTEXT_FILE;

/// Base URL of the package index JSON API.
pub const ENV_INDEX_URL: &str = "PACKAGES_INSPECTOR_INDEX_URL";
/// Per-request index timeout, in seconds.
pub const ENV_INDEX_TIMEOUT: &str = "PACKAGES_INSPECTOR_INDEX_TIMEOUT";
/// Fuzzy match threshold.
pub const ENV_SIMILARITY: &str = "PACKAGES_INSPECTOR_SIMILARITY";

const DEFAULT_INDEX_TIMEOUT_SECS: u64 = 5;

/// How candidates are looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexConfig {
    /// Query the online index; the built-in offline index is used otherwise.
    pub enabled: bool,
    /// Base URL of the JSON API.
    pub url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// Everything an inspection run needs to know.
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::struct_excessive_bools)]
pub struct InspectConfig {
    /// Codebase root.
    pub root: PathBuf,
    /// Location of the context file.
    pub context_file: PathBuf,
    /// Whether the context file is rewritten.
    pub persist_context: bool,
    /// The declarations file, if any.
    pub declarations: Option<DeclarationsSource>,
    /// Drift is reported through the exit status.
    pub error_on_diff: bool,
    /// Top-level modules forced into the audit.
    pub extra_modules: BTreeSet<String>,
    /// Packages counted as required.
    pub extra_packages: BTreeSet<String>,
    /// Modules ignored for this run.
    pub ignore_modules: BTreeSet<String>,
    /// Explicit module to package mappings.
    pub overrides: BTreeMap<String, String>,
    /// Packages never reported unused.
    pub keep_packages: BTreeSet<String>,
    /// Whether the operator is prompted.
    pub interactive: bool,
    /// Package index settings.
    pub index: IndexConfig,
    /// Minimum fuzzy similarity.
    pub similarity_threshold: f64,
    /// Rewrite the declarations file.
    pub apply: bool,
}

impl InspectConfig {
    /// Resolves `cli` against the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error when an environment value cannot be parsed.
    pub fn from_cli(cli: &Cli) -> Result<Self, String> {
        Self::from_cli_with_env(cli, |key| std::env::var(key).ok())
    }

    /// Resolves `cli`, reading environment fallbacks through `env`.
    /// Command-line values win over the environment.
    ///
    /// # Errors
    ///
    /// Returns an error when an environment value cannot be parsed.
    pub fn from_cli_with_env(
        cli: &Cli,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, String> {
        let similarity_threshold = match (cli.similarity_threshold, env(ENV_SIMILARITY)) {
            (Some(value), _) => value,
            (None, Some(raw)) => {
                parse_threshold(&raw).map_err(|e| format!("{ENV_SIMILARITY}: {e}"))?
            }
            (None, None) => DEFAULT_SIMILARITY_THRESHOLD,
        };
        let timeout_secs = match (cli.index_timeout, env(ENV_INDEX_TIMEOUT)) {
            (Some(value), _) => value,
            (None, Some(raw)) => raw
                .trim()
                .parse()
                .map_err(|_| format!("{ENV_INDEX_TIMEOUT}: {raw:?} is not a number of seconds"))?,
            (None, None) => DEFAULT_INDEX_TIMEOUT_SECS,
        };

        let declarations = match (&cli.requirements, &cli.pipfile) {
            (Some(path), _) => Some(DeclarationsSource {
                path: path.clone(),
                format: DeclarationsFormat::Requirements,
            }),
            (None, Some(path)) => {
                Some(DeclarationsSource { path: path.clone(), format: DeclarationsFormat::Pipfile })
            }
            (None, None) => None,
        };

        Ok(Self {
            root: cli.path.clone(),
            context_file: cli
                .context_file
                .clone()
                .unwrap_or_else(|| cli.path.join(DEFAULT_CONTEXT_FILE)),
            persist_context: cli.persist_context(),
            declarations,
            error_on_diff: cli.fail_on_diff(),
            extra_modules: cli.extra_modules.iter().filter_map(|m| top_level(m)).collect(),
            extra_packages: cli.extra_packages.iter().cloned().collect(),
            ignore_modules: cli.ignore_modules.iter().filter_map(|m| top_level(m)).collect(),
            overrides: cli.mappings.iter().cloned().collect(),
            keep_packages: cli.keep_packages.iter().cloned().collect(),
            interactive: cli.interactive(),
            index: IndexConfig {
                enabled: cli.use_index(),
                url: env(ENV_INDEX_URL).unwrap_or_else(|| DEFAULT_INDEX_URL.to_string()),
                timeout: Duration::from_secs(timeout_secs),
            },
            similarity_threshold,
            apply: cli.apply,
        })
    }
}

fn top_level(module: &str) -> Option<String> {
    let name = module.trim().split('.').next()?;
    (!name.is_empty()).then(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_follow_the_codebase_root() {
        let cli = Cli::parse_from(["packages-inspector", "/srv/app"]);
        let config = InspectConfig::from_cli_with_env(&cli, no_env).unwrap();
        assert_eq!(config.context_file, PathBuf::from("/srv/app/.packages-inspector.yaml"));
        assert_eq!(config.index.url, DEFAULT_INDEX_URL);
        assert_eq!(config.index.timeout, Duration::from_secs(5));
        assert!((config.similarity_threshold - DEFAULT_SIMILARITY_THRESHOLD).abs() < f64::EPSILON);
        assert!(config.declarations.is_none());
    }

    #[test]
    fn environment_fills_unset_options() {
        let cli = Cli::parse_from(["packages-inspector", "--index-timeout", "2"]);
        let env = |key: &str| match key {
            ENV_INDEX_URL => Some("http://localhost:8080/pypi".to_string()),
            ENV_INDEX_TIMEOUT => Some("30".to_string()),
            ENV_SIMILARITY => Some("0.75".to_string()),
            _ => None,
        };
        let config = InspectConfig::from_cli_with_env(&cli, env).unwrap();
        assert_eq!(config.index.url, "http://localhost:8080/pypi");
        assert_eq!(config.index.timeout, Duration::from_secs(2));
        assert!((config.similarity_threshold - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn bad_environment_value_is_an_error() {
        let cli = Cli::parse_from(["packages-inspector"]);
        let env = |key: &str| (key == ENV_SIMILARITY).then(|| "lots".to_string());
        assert!(InspectConfig::from_cli_with_env(&cli, env).is_err());
    }

    #[test]
    fn module_options_keep_the_top_level_name() {
        let cli =
            Cli::parse_from(["packages-inspector", "-e", "google.cloud.storage", "-i", "a.b"]);
        let config = InspectConfig::from_cli_with_env(&cli, no_env).unwrap();
        assert!(config.extra_modules.contains("google"));
        assert!(config.ignore_modules.contains("a"));
    }

    #[test]
    fn pipfile_source() {
        let cli = Cli::parse_from(["packages-inspector", "--pipfile", "Pipfile"]);
        let config = InspectConfig::from_cli_with_env(&cli, no_env).unwrap();
        let source = config.declarations.unwrap();
        assert_eq!(source.format, DeclarationsFormat::Pipfile);
        assert_eq!(source.path, PathBuf::from("Pipfile"));
    }
}
