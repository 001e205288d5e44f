//! Prompt port for asking the operator to settle a module's package.

use crate::resolve::Candidate;

/// What the operator decided for one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    /// Take the top-ranked candidate.
    AcceptTop,
    /// Take the candidate at this 0-based position of the ranked list.
    Pick(usize),
    /// Use a package name typed by the operator.
    Custom(String),
    /// Leave the module out of the dependency audit.
    Ignore,
    /// Stop the run without saving anything.
    Abort,
}

/// Asks the operator to choose a package for a module.
pub trait Prompter {
    /// Presents `candidates` (ranked, never empty) for `module` and
    /// returns the operator's choice.
    ///
    /// # Errors
    ///
    /// Returns an error if the interaction channel fails.
    fn choose(
        &mut self,
        module: &str,
        candidates: &[Candidate],
    ) -> Result<Choice, Box<dyn std::error::Error + Send + Sync>>;
}
