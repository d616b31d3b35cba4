//! Store adapters and the completion cache.

pub mod cache;
pub mod memory;
pub mod sqlite;
