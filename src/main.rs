//! Binary entrypoint for the `packages-inspector` CLI.

use std::process::ExitCode;

use packages_inspector::Outcome;

fn main() -> ExitCode {
    match packages_inspector::run(std::env::args()) {
        Ok(Outcome::Clean) => ExitCode::SUCCESS,
        Ok(Outcome::Drift) => ExitCode::from(2),
        Ok(Outcome::Aborted) => ExitCode::from(130),
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
