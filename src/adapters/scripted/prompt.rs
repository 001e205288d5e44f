//! Scripted `Prompter` for deterministic, operator-free runs.

use std::collections::VecDeque;

use crate::ports::prompt::{Choice, Prompter};
use crate::resolve::Candidate;

/// Answers prompts from a queue of predetermined choices and remembers
/// what it was asked.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<Choice>,
    asked: Vec<(String, Vec<String>)>,
}

impl ScriptedPrompter {
    /// Creates a prompter answering with `answers`, in order.
    pub fn new(answers: impl IntoIterator<Item = Choice>) -> Self {
        Self { answers: answers.into_iter().collect(), asked: Vec::new() }
    }

    /// Modules prompted so far, with the packages offered for each.
    #[must_use]
    pub fn asked(&self) -> &[(String, Vec<String>)] {
        &self.asked
    }

    /// Names of the modules prompted so far.
    #[must_use]
    pub fn asked_modules(&self) -> Vec<&str> {
        self.asked.iter().map(|(m, _)| m.as_str()).collect()
    }
}

impl Prompter for ScriptedPrompter {
    fn choose(
        &mut self,
        module: &str,
        candidates: &[Candidate],
    ) -> Result<Choice, Box<dyn std::error::Error + Send + Sync>> {
        let packages = candidates.iter().map(|c| c.package.clone()).collect();
        self.asked.push((module.to_string(), packages));
        self.answers
            .pop_front()
            .ok_or_else(|| format!("script exhausted: no answer left for module {module}").into())
    }
}
