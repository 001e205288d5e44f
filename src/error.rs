//! Fatal errors and per-item warnings raised during an inspection run.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort an inspection run.
#[derive(Debug, Error)]
pub enum InspectError {
    /// The codebase root cannot be walked.
    #[error("cannot scan {}: {reason}", path.display())]
    Scan {
        /// The codebase root.
        path: PathBuf,
        /// Why the walk failed.
        reason: String,
    },
    /// The persisted context file exists but is not a valid record.
    #[error("invalid context file {}: {reason}", path.display())]
    ContextValidation {
        /// Location of the offending file.
        path: PathBuf,
        /// What is wrong with it.
        reason: String,
    },
    /// The context file could not be read or written.
    #[error("context file {}: {reason}", path.display())]
    ContextIo {
        /// Location of the context file.
        path: PathBuf,
        /// Underlying I/O failure.
        reason: String,
    },
    /// An explicitly requested declarations file could not be read.
    #[error("cannot read declarations file {}: {reason}", path.display())]
    Declarations {
        /// Location of the declarations file.
        path: PathBuf,
        /// Underlying I/O failure.
        reason: String,
    },
    /// The operator cancelled the reconciliation.
    #[error("aborted by the operator, context file left untouched")]
    UserAbort,
    /// Talking to the operator failed.
    #[error("prompt failed: {0}")]
    Prompt(String),
    /// Rewriting the declarations file failed.
    #[error("cannot apply changes to {}: {reason}", path.display())]
    Apply {
        /// Location of the declarations file.
        path: PathBuf,
        /// Underlying I/O failure.
        reason: String,
    },
}

/// A non-fatal issue with a single item; the run continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Warning {
    /// A source file could not be read.
    #[error("skipped {}: {reason}", path.display())]
    Scan {
        /// The skipped file.
        path: PathBuf,
        /// Why it was skipped.
        reason: String,
    },
    /// A declarations entry was not understood.
    #[error("{}", declaration_message(*line, content))]
    Declaration {
        /// 1-based line number, 0 when the whole file is affected.
        line: usize,
        /// The offending text.
        content: String,
    },
    /// A package-index query failed or timed out.
    #[error("package index lookup failed for {module}: {reason}")]
    Lookup {
        /// The module being resolved.
        module: String,
        /// What went wrong.
        reason: String,
    },
    /// A requested change could not be applied.
    #[error("{0}")]
    Apply(String),
}

fn declaration_message(line: usize, content: &str) -> String {
    if line == 0 {
        format!("unrecognized declarations: {content}")
    } else {
        format!("unrecognized declaration on line {line}: {content}")
    }
}

/// Accumulates warnings over a run, logging each one as it is raised.
#[derive(Debug, Default)]
pub struct Warnings {
    items: Vec<Warning>,
}

impl Warnings {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a warning.
    pub fn push(&mut self, warning: Warning) {
        tracing::warn!("{warning}");
        self.items.push(warning);
    }

    /// All warnings in the order they were raised.
    #[must_use]
    pub fn items(&self) -> &[Warning] {
        &self.items
    }

    /// Returns `true` when nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
