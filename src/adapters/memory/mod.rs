//! In-memory store adapters.
//!
//! Used by unit tests and by callers that assemble the engine without a
//! database. Each store counts its batched reads so callers can check that a
//! computation issued one query per store.

pub mod stores;

pub use stores::{InMemoryLegacyAuthoringSource, InMemoryProgressRepository, InMemorySongRepository, InMemoryWorkflowRepository};
