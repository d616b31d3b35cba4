//! Port trait definitions (Hexagonal Architecture)
//!
//! Async interfaces the store adapters implement. Every read is batched by an
//! id set so callers never issue per-song queries.

pub mod default_workflow;
pub mod legacy_authoring_source;
pub mod progress_repository;
pub mod song_repository;
pub mod workflow_repository;

pub use default_workflow::{DefaultWorkflowProvider, LegacyDefaultWorkflow};
pub use legacy_authoring_source::LegacyAuthoringSource;
pub use progress_repository::ProgressRepository;
pub use song_repository::SongRepository;
pub use workflow_repository::WorkflowRepository;
