//! Per-song, per-step progress facts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::models::SongId;

/// Completion flags per step, per song: `song_id -> step_name -> completed`.
///
/// A song missing from the map has no dynamic progress recorded at all.
pub type ProgressMap = HashMap<SongId, HashMap<String, bool>>;

/// What happens to `completed_at` when a completed step is un-completed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UncompletePolicy {
    /// Clear the timestamp so `completed_at` is set iff `is_completed`.
    #[default]
    Clear,
    /// Keep the last completion timestamp as history.
    Preserve,
}

impl UncompletePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Preserve => "preserve",
        }
    }
}

/// Completion state of one step for one song. Unique on `(song_id, step_name)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongProgress {
    pub song_id: SongId,
    pub step_name: String,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl SongProgress {
    /// A row that does not exist yet, created directly in the requested state.
    pub fn new(song_id: SongId, step_name: impl Into<String>, is_completed: bool, now: DateTime<Utc>) -> Self {
        Self {
            song_id,
            step_name: step_name.into(),
            is_completed,
            completed_at: is_completed.then_some(now),
            notes: None,
            updated_at: now,
        }
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }

    /// Move this row to a new completion state.
    ///
    /// `completed_at` is stamped only on a transition into completed; an
    /// already-completed step keeps its original timestamp. `notes` of `None`
    /// keeps the existing notes.
    pub fn transition(
        &self,
        is_completed: bool,
        notes: Option<String>,
        now: DateTime<Utc>,
        policy: UncompletePolicy,
    ) -> Self {
        let completed_at = match (self.is_completed, is_completed) {
            (true, true) => self.completed_at.or(Some(now)),
            (false, true) => Some(now),
            (_, false) => match policy {
                UncompletePolicy::Clear => None,
                UncompletePolicy::Preserve => self.completed_at,
            },
        };

        Self {
            song_id: self.song_id,
            step_name: self.step_name.clone(),
            is_completed,
            completed_at,
            notes: notes.or_else(|| self.notes.clone()),
            updated_at: now,
        }
    }

    /// Completed without a timestamp: counted as complete, flagged as bad data.
    pub fn is_missing_timestamp(&self) -> bool {
        self.is_completed && self.completed_at.is_none()
    }
}

/// Collapse progress rows into a [`ProgressMap`].
///
/// Returns the map and the number of rows marked completed without a
/// `completed_at` timestamp. Those rows still count as completed.
pub fn collapse_progress_rows(rows: impl IntoIterator<Item = SongProgress>) -> (ProgressMap, usize) {
    let mut map: ProgressMap = HashMap::new();
    let mut missing_timestamps = 0;

    for row in rows {
        if row.is_missing_timestamp() {
            missing_timestamps += 1;
        }
        map.entry(row.song_id)
            .or_default()
            .insert(row.step_name, row.is_completed);
    }

    (map, missing_timestamps)
}
