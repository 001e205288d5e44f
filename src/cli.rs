//! CLI argument definitions.

use std::path::PathBuf;

use clap::Parser;

/// Top-level CLI parser for `packages-inspector`.
///
/// Paired `--x` / `--no-x` flags override each other; the last one given
/// wins.
#[derive(Debug, Parser)]
#[command(
    name = "packages-inspector",
    version,
    about = "Find and validate the packages a Python codebase requires"
)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Path of the codebase to inspect.
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Also print the debug logs.
    #[arg(short, long)]
    pub verbose: bool,

    /// Path to the YAML context file [default: <PATH>/.packages-inspector.yaml].
    #[arg(long, value_name = "FILE")]
    pub context_file: Option<PathBuf>,

    /// Update the context file based on the current run (default).
    #[arg(long, overrides_with = "no_update_context_file")]
    pub update_context_file: bool,
    /// Leave the context file untouched.
    #[arg(long, overrides_with = "update_context_file")]
    pub no_update_context_file: bool,

    /// A requirements file to compare against.
    #[arg(long, value_name = "FILE", conflicts_with = "pipfile")]
    pub requirements: Option<PathBuf>,
    /// A Pipfile to compare against.
    #[arg(long, value_name = "FILE")]
    pub pipfile: Option<PathBuf>,

    /// Exit with status 2 when missing or unused packages are found (default).
    #[arg(long, overrides_with = "no_error_on_diff")]
    pub error_on_diff: bool,
    /// Exit successfully even when missing or unused packages are found.
    #[arg(long, overrides_with = "error_on_diff")]
    pub no_error_on_diff: bool,

    /// Extra module to consider, as if it were imported.
    #[arg(short = 'e', long = "extra-module", value_name = "MODULE")]
    pub extra_modules: Vec<String>,
    /// Extra package to count as required.
    #[arg(long = "extra-package", value_name = "PACKAGE")]
    pub extra_packages: Vec<String>,
    /// Module to leave out of the audit.
    #[arg(short = 'i', long = "ignore-module", value_name = "MODULE")]
    pub ignore_modules: Vec<String>,
    /// Explicit mapping in the form module:package.
    #[arg(
        short = 'm',
        long = "mapping",
        value_name = "MODULE:PACKAGE",
        value_parser = parse_mapping
    )]
    pub mappings: Vec<(String, String)>,
    /// Package that is never reported unused.
    #[arg(long = "keep-package", value_name = "PACKAGE")]
    pub keep_packages: Vec<String>,

    /// Ask before settling unknown modules (default).
    #[arg(long, overrides_with = "no_interaction")]
    pub interaction: bool,
    /// Accept the best candidate for every unknown module.
    #[arg(long, overrides_with = "interaction")]
    pub no_interaction: bool,

    /// Query the package index for candidates (default).
    #[arg(long, overrides_with = "no_index_lookups")]
    pub index_lookups: bool,
    /// Resolve from local knowledge only.
    #[arg(long, overrides_with = "index_lookups")]
    pub no_index_lookups: bool,

    /// Apply the changes to the requirements file.
    #[arg(long)]
    pub apply: bool,

    /// Minimum similarity, between 0 and 1, for fuzzy candidates [default: 0.6].
    #[arg(long, value_name = "SCORE", value_parser = parse_threshold)]
    pub similarity_threshold: Option<f64>,

    /// Timeout in seconds for each package index request [default: 5].
    #[arg(long, value_name = "SECS")]
    pub index_timeout: Option<u64>,
}

impl Cli {
    /// Whether the context file is written at the end of the run.
    #[must_use]
    pub fn persist_context(&self) -> bool {
        !self.no_update_context_file
    }

    /// Whether drift is reported through the exit status.
    #[must_use]
    pub fn fail_on_diff(&self) -> bool {
        !self.no_error_on_diff
    }

    /// Whether the operator is prompted.
    #[must_use]
    pub fn interactive(&self) -> bool {
        !self.no_interaction
    }

    /// Whether the online package index is queried.
    #[must_use]
    pub fn use_index(&self) -> bool {
        !self.no_index_lookups
    }
}

fn parse_mapping(raw: &str) -> Result<(String, String), String> {
    match raw.split_once(':') {
        Some((module, package))
            if !module.trim().is_empty() && !package.trim().is_empty() && !package.contains(':') =>
        {
            Ok((module.trim().to_string(), package.trim().to_string()))
        }
        _ => Err(format!("expected MODULE:PACKAGE, got {raw:?}")),
    }
}

/// Parses a similarity threshold in `[0, 1]`.
///
/// # Errors
///
/// Returns an error for non-numbers and out-of-range values.
pub fn parse_threshold(raw: &str) -> Result<f64, String> {
    let value: f64 = raw.trim().parse().map_err(|_| format!("{raw:?} is not a number"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is not between 0 and 1"))
    }
}
