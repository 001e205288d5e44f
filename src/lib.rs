//! Core library entry for the `packages-inspector` CLI.
//!
//! The inspection pipeline scans a Python codebase for the modules it
//! imports, maps each one to an installable package, remembers the
//! operator's decisions in a context file and reports how the declared
//! dependencies drift from the required ones.

pub mod adapters;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod declarations;
pub mod drift;
pub mod error;
pub mod ports;
pub mod reconcile;
pub mod resolve;
pub mod scan;
pub mod store;

use clap::error::ErrorKind;
use clap::Parser;
use tracing_subscriber::EnvFilter;

pub use commands::Outcome;

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or the inspection
/// fails.
pub fn run<I, T>(args: I) -> Result<Outcome, String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match cli::Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            print!("{err}");
            return Ok(Outcome::Clean);
        }
        Err(err) => return Err(err.to_string()),
    };
    // A missing .env file is not an error.
    let _ = dotenvy::dotenv();
    init_logging(cli.verbose);
    commands::dispatch(&cli)
}

/// Installs the stderr log subscriber. `RUST_LOG` overrides the level.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}
