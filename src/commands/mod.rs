//! Command dispatch and handlers.

pub mod inspect;

use std::io;

use crate::cli::Cli;
use crate::config::InspectConfig;
use crate::context::ServiceContext;

pub use inspect::Outcome;

/// Run the inspection described by the parsed command line.
///
/// # Errors
///
/// Returns an error string if the configuration is invalid or the
/// inspection fails.
pub fn dispatch(cli: &Cli) -> Result<Outcome, String> {
    let config = InspectConfig::from_cli(cli)?;
    tracing::debug!(?config, "configuration");
    let mut ctx = ServiceContext::live(&config)?;
    inspect::run_with_context(&config, &mut ctx, &mut io::stdout().lock())
}
