//! Derived completion results.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::models::SongId;

/// Completion results keyed by song id.
pub type CompletionMap = HashMap<SongId, CompletionResult>;

/// Completion of one song against its owner's effective workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResult {
    /// Percentage 0-100, or `None` when the effective workflow has no steps.
    pub completion: Option<u8>,
    /// Display names of incomplete steps, in workflow order. Only filled when
    /// remaining steps were requested.
    pub remaining_steps: Vec<String>,
    /// Step identifiers the percentage was computed over.
    pub workflow_fields: Vec<String>,
}

impl CompletionResult {
    /// Result for a song whose effective workflow is empty.
    pub fn undefined() -> Self {
        Self::default()
    }
}

/// `round(100 * completed / total)` with halves rounded up, in integer math.
///
/// Returns `None` for a zero-step workflow. `completed` is clamped to `total`.
pub fn completion_percentage(completed: usize, total: usize) -> Option<u8> {
    if total == 0 {
        return None;
    }
    let completed = completed.min(total) as u64;
    let total = total as u64;
    let rounded = (200 * completed + total) / (2 * total);
    u8::try_from(rounded).ok()
}
