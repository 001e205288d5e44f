//! Live adapters for real external interactions.

pub mod filesystem;
pub mod package_index;
pub mod prompt;
