//! Cache-through access to completion results.

use std::sync::Arc;

use crate::adapters::cache::CompletionCache;
use crate::domain::errors::DomainResult;
use crate::domain::models::{CompletionMap, SongId, SongRef};
use crate::services::completion_calculator::CompletionCalculator;

/// Serves completion lookups from the cache, computing and storing on a miss.
pub struct CompletionService {
    calculator: CompletionCalculator,
    cache: Option<Arc<CompletionCache>>,
}

impl CompletionService {
    pub fn new(calculator: CompletionCalculator, cache: Arc<CompletionCache>) -> Self {
        Self {
            calculator,
            cache: Some(cache),
        }
    }

    /// Always compute; nothing is cached.
    pub fn uncached(calculator: CompletionCalculator) -> Self {
        Self { calculator, cache: None }
    }

    pub fn cache(&self) -> Option<&Arc<CompletionCache>> {
        self.cache.as_ref()
    }

    /// Completion for `songs`, keyed by song id.
    pub async fn completion_for(&self, songs: &[SongRef], include_remaining_steps: bool) -> DomainResult<CompletionMap> {
        let Some(cache) = &self.cache else {
            return self.calculator.compute(songs, include_remaining_steps).await;
        };
        if songs.is_empty() {
            return Ok(CompletionMap::new());
        }

        let song_ids: Vec<SongId> = songs.iter().map(|s| s.id).collect();
        if let Some(hit) = cache.get(&song_ids, include_remaining_steps) {
            return Ok(hit);
        }

        // Read before computing so a concurrent invalidation voids this result.
        let generation = cache.generation();
        let results = self.calculator.compute(songs, include_remaining_steps).await?;
        cache.set_if_generation(&song_ids, include_remaining_steps, results.clone(), None, generation);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryLegacyAuthoringSource, InMemoryProgressRepository, InMemoryWorkflowRepository};
    use crate::domain::models::{SongProgress, WorkflowStep};
    use crate::domain::ports::{LegacyDefaultWorkflow, ProgressRepository};
    use crate::services::legacy_bridge::LegacyBridge;
    use chrono::Utc;

    struct Fixture {
        workflows: Arc<InMemoryWorkflowRepository>,
        progress: Arc<InMemoryProgressRepository>,
        cache: Arc<CompletionCache>,
        service: CompletionService,
    }

    fn fixture() -> Fixture {
        let workflows = Arc::new(InMemoryWorkflowRepository::new());
        let progress = Arc::new(InMemoryProgressRepository::new());
        let calculator = CompletionCalculator::new(
            workflows.clone(),
            progress.clone(),
            LegacyBridge::new(Arc::new(InMemoryLegacyAuthoringSource::default())),
            Arc::new(LegacyDefaultWorkflow),
        );
        let cache = Arc::new(CompletionCache::default());
        let service = CompletionService::new(calculator, cache.clone());
        Fixture {
            workflows,
            progress,
            cache,
            service,
        }
    }

    #[tokio::test]
    async fn test_second_lookup_is_served_from_cache() {
        let f = fixture();
        f.workflows.put_steps(1, vec![WorkflowStep::new("drums", "Drums", 0)]).await;

        let songs = [SongRef::new(10, 1), SongRef::new(11, 1)];
        let first = f.service.completion_for(&songs, false).await.unwrap();
        let reversed = [songs[1], songs[0]];
        let second = f.service.completion_for(&reversed, false).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(f.progress.batch_reads(), 1);
        assert_eq!(f.cache.len(), 1);
    }

    #[tokio::test]
    async fn test_invalidation_forces_recompute() {
        let f = fixture();
        f.workflows.put_steps(1, vec![WorkflowStep::new("drums", "Drums", 0)]).await;
        let songs = [SongRef::new(10, 1)];

        let before = f.service.completion_for(&songs, false).await.unwrap();
        assert_eq!(before[&10].completion, Some(0));

        f.progress
            .upsert(&[SongProgress::new(10, "drums", true, Utc::now())])
            .await
            .unwrap();
        f.cache.invalidate_song(10);

        let after = f.service.completion_for(&songs, false).await.unwrap();
        assert_eq!(after[&10].completion, Some(100));
        assert_eq!(f.progress.batch_reads(), 2);
    }

    #[tokio::test]
    async fn test_uncached_always_computes() {
        let progress = Arc::new(InMemoryProgressRepository::new());
        let calculator = CompletionCalculator::new(
            Arc::new(InMemoryWorkflowRepository::new()),
            progress.clone(),
            LegacyBridge::new(Arc::new(InMemoryLegacyAuthoringSource::default())),
            Arc::new(LegacyDefaultWorkflow),
        );
        let service = CompletionService::uncached(calculator);

        let songs = [SongRef::new(1, 1)];
        service.completion_for(&songs, true).await.unwrap();
        service.completion_for(&songs, true).await.unwrap();
        assert_eq!(progress.batch_reads(), 2);
        assert!(service.cache().is_none());
    }
}
