//! In-memory adapters for tests and dry runs.

pub mod filesystem;

pub use filesystem::MemoryFileSystem;
