//! Adapter implementations of the port traits.

pub mod live;
pub mod memory;
pub mod offline;
pub mod scripted;
