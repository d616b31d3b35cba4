//! Completion calculator.
//!
//! Computes, for each song, the percentage of its owner's effective workflow
//! that is complete. All store reads are batched across the requested songs:
//! one workflow lookup for the distinct owners, one progress lookup for the
//! songs, and at most one legacy lookup for the songs with no dynamic
//! progress.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    completion_percentage, CompletionMap, CompletionResult, SongId, SongRef, UserId, WorkflowStep,
};
use crate::domain::ports::{DefaultWorkflowProvider, ProgressRepository, WorkflowRepository};
use crate::services::legacy_bridge::LegacyBridge;

pub struct CompletionCalculator {
    workflows: Arc<dyn WorkflowRepository>,
    progress: Arc<dyn ProgressRepository>,
    legacy: LegacyBridge,
    defaults: Arc<dyn DefaultWorkflowProvider>,
}

impl CompletionCalculator {
    pub fn new(
        workflows: Arc<dyn WorkflowRepository>,
        progress: Arc<dyn ProgressRepository>,
        legacy: LegacyBridge,
        defaults: Arc<dyn DefaultWorkflowProvider>,
    ) -> Self {
        Self {
            workflows,
            progress,
            legacy,
            defaults,
        }
    }

    /// Completion for each distinct song in `songs`.
    ///
    /// `remaining_steps` is only filled when `include_remaining_steps` is set.
    /// Workflow and progress store errors propagate; legacy failures do not.
    pub async fn compute(&self, songs: &[SongRef], include_remaining_steps: bool) -> DomainResult<CompletionMap> {
        let mut seen = HashSet::new();
        let songs: Vec<SongRef> = songs.iter().copied().filter(|s| seen.insert(s.id)).collect();
        if songs.is_empty() {
            return Ok(HashMap::new());
        }

        let song_ids: Vec<SongId> = songs.iter().map(|s| s.id).collect();
        let owner_ids: Vec<UserId> = songs
            .iter()
            .map(|s| s.owner_user_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let (workflow_steps, progress) = tokio::try_join!(
            self.workflows.steps_for_users(&owner_ids),
            self.progress.progress_for_songs(&song_ids),
        )?;

        // Fallback is all-or-nothing: any dynamic row for a song rules out legacy data.
        let needs_legacy: Vec<SongId> = songs
            .iter()
            .filter(|s| progress.get(&s.id).map_or(true, HashMap::is_empty))
            .map(|s| s.id)
            .collect();
        let legacy = self.legacy.progress_for_songs(&needs_legacy).await;

        let default_steps = self.default_steps();

        debug!(
            songs = songs.len(),
            owners = owner_ids.len(),
            owners_with_workflow = workflow_steps.len(),
            legacy_candidates = needs_legacy.len(),
            legacy_hits = legacy.len(),
            "computing completion"
        );

        let results = songs
            .iter()
            .map(|song| {
                let steps = workflow_steps
                    .get(&song.owner_user_id)
                    .map_or(default_steps.as_slice(), Vec::as_slice);
                let song_progress = progress
                    .get(&song.id)
                    .filter(|p| !p.is_empty())
                    .or_else(|| legacy.get(&song.id));
                (song.id, self.evaluate(steps, song_progress, include_remaining_steps))
            })
            .collect();

        Ok(results)
    }

    fn default_steps(&self) -> Vec<WorkflowStep> {
        self.defaults
            .default_steps()
            .into_iter()
            .enumerate()
            .map(|(index, step_name)| {
                let display_name = self.defaults.display_name(&step_name);
                WorkflowStep::new(step_name, display_name, index as i64)
            })
            .collect()
    }

    fn display_name(&self, step: &WorkflowStep) -> String {
        if step.display_name.trim().is_empty() {
            self.defaults.display_name(&step.step_name)
        } else {
            step.display_name.clone()
        }
    }

    fn evaluate(
        &self,
        steps: &[WorkflowStep],
        progress: Option<&HashMap<String, bool>>,
        include_remaining_steps: bool,
    ) -> CompletionResult {
        if steps.is_empty() {
            return CompletionResult::undefined();
        }

        let is_done = |step: &WorkflowStep| {
            progress
                .and_then(|p| p.get(&step.step_name))
                .copied()
                .unwrap_or(false)
        };

        let completed = steps.iter().filter(|step| is_done(*step)).count();
        let remaining_steps = if include_remaining_steps {
            steps
                .iter()
                .filter(|step| !is_done(*step))
                .map(|step| self.display_name(step))
                .collect()
        } else {
            Vec::new()
        };

        CompletionResult {
            completion: completion_percentage(completed, steps.len()),
            remaining_steps,
            workflow_fields: steps.iter().map(|s| s.step_name.clone()).collect(),
        }
    }
}
