//! Domain layer for the TrackFlow completion engine
//!
//! Pure data types, invariants and port traits. Nothing in here touches a
//! database or the clock except through the ports.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
