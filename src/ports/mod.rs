//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the inspection core and an
//! external system (disk, package index, operator). Implementations live
//! in `src/adapters/`.

pub mod filesystem;
pub mod package_index;
pub mod prompt;

pub use filesystem::{FileSystem, WalkEntry};
pub use package_index::{IndexHit, PackageIndex};
pub use prompt::{Choice, Prompter};
