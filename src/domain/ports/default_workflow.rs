//! Default workflow provider port.

use crate::domain::models::{humanize_step_name, LEGACY_STEP_FIELDS};

/// Supplies the fallback step list for owners without a workflow and
/// display names for steps that have none.
pub trait DefaultWorkflowProvider: Send + Sync {
    /// Step identifiers used when the owner has no workflow row.
    fn default_steps(&self) -> Vec<String>;

    /// Human-readable name for a step identifier.
    fn display_name(&self, step_name: &str) -> String {
        humanize_step_name(step_name)
    }
}

/// The fifteen legacy authoring steps in their historical order.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyDefaultWorkflow;

impl DefaultWorkflowProvider for LegacyDefaultWorkflow {
    fn default_steps(&self) -> Vec<String> {
        LEGACY_STEP_FIELDS.iter().map(|s| (*s).to_string()).collect()
    }
}
