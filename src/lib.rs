//! TrackFlow - workflow-based song completion tracking
//!
//! Tracks songs through per-user workflows of production steps and computes
//! how complete each song is against its owner's workflow. Songs that predate
//! per-step progress are read through the legacy fixed-column authoring
//! record until they are backfilled.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Models, invariants and port traits
//! - **Adapters** (`adapters`): SQLite and in-memory stores, the completion cache
//! - **Service Layer** (`services`): Completion, progress, workflow and backfill logic
//! - **Infrastructure Layer** (`infrastructure`): Configuration and logging
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use trackflow::cli::AppContext;
//! use trackflow::{ConfigLoader, SongRef};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let ctx = AppContext::open(ConfigLoader::load()?).await?;
//!     let results = ctx
//!         .completion_service()
//!         .completion_for(&[SongRef::new(1, 1)], true)
//!         .await?;
//!     println!("{:?}", results.get(&1));
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use adapters::cache::{CacheKey, CompletionCache};
pub use domain::models::{
    CompletionMap, CompletionResult, Config, LegacyAuthoringRecord, LegacyAvailability, SongId,
    SongProgress, SongRef, StepSpec, UncompletePolicy, UserId, UserWorkflow, WorkflowStep,
    WorkflowTemplate,
};
pub use domain::ports::{
    DefaultWorkflowProvider, LegacyAuthoringSource, ProgressRepository, SongRepository,
    WorkflowRepository,
};
pub use domain::{DomainError, DomainResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    BackfillOptions, BackfillReport, BackfillService, CompletionCalculator, CompletionService,
    LegacyBridge, ProgressService, WorkflowService,
};
