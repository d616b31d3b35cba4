//! In-memory caching layer for completion results.
//!
//! Entries expire after a TTL and are dropped explicitly whenever progress or
//! a workflow changes.

pub mod completion_cache;

pub use completion_cache::{CacheKey, CompletionCache, DEFAULT_CLEANUP_THRESHOLD, DEFAULT_TTL};
