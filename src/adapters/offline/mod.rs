//! Offline adapters that never touch the network.

pub mod aliases;
pub mod package_index;

pub use package_index::OfflinePackageIndex;
