//! Scripted adapters replaying predetermined answers.

pub mod prompt;

pub use prompt::ScriptedPrompter;
