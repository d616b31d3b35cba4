//! Domain models

pub mod completion;
pub mod config;
pub mod legacy;
pub mod progress;
pub mod song;
pub mod workflow;

pub use completion::{completion_percentage, CompletionMap, CompletionResult};
pub use config::{BackfillConfig, CacheConfig, Config, DatabaseConfig, LoggingConfig, ProgressConfig};
pub use legacy::{is_legacy_step, LegacyAuthoringRecord, LegacyAvailability, LEGACY_STEP_FIELDS};
pub use progress::{collapse_progress_rows, ProgressMap, SongProgress, UncompletePolicy};
pub use song::{SongId, SongRef, UserId};
pub use workflow::{
    humanize_step_name, sort_steps, validate_step_name, validate_steps, StepSpec, UserWorkflow,
    WorkflowStep, WorkflowTemplate,
};
