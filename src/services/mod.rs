pub mod backfill;
pub mod completion_calculator;
pub mod completion_service;
pub mod legacy_bridge;
pub mod progress_service;
pub mod workflow_service;

pub use backfill::{BackfillOptions, BackfillReport, BackfillService};
pub use completion_calculator::CompletionCalculator;
pub use completion_service::CompletionService;
pub use legacy_bridge::LegacyBridge;
pub use progress_service::ProgressService;
pub use workflow_service::WorkflowService;
