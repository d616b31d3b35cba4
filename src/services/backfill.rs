//! Backfill of dynamic progress rows from legacy authoring records.
//!
//! Legacy records are paged by song id. For each page the owners, their
//! workflows and the existing progress rows are read in batches, and the
//! planned writes are applied with a single upsert. A row is only written
//! when its desired state differs from what is stored, so rerunning over
//! unchanged data writes nothing.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::adapters::cache::CompletionCache;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    is_legacy_step, LegacyAuthoringRecord, LegacyAvailability, SongId, SongProgress, UncompletePolicy, UserId,
};
use crate::domain::ports::{LegacyAuthoringSource, ProgressRepository, SongRepository, WorkflowRepository};

/// Default number of legacy records per page.
pub const DEFAULT_BATCH_SIZE: usize = 500;

#[derive(Debug, Clone, Copy)]
pub struct BackfillOptions {
    /// Plan and report without writing.
    pub dry_run: bool,
    /// Skip songs that already have any dynamic progress row.
    pub only_missing: bool,
    pub batch_size: usize,
}

impl Default for BackfillOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            only_missing: false,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    pub dry_run: bool,
    pub batches: usize,
    pub songs_scanned: usize,
    pub songs_skipped: usize,
    pub rows_inserted: usize,
    pub rows_updated: usize,
    pub rows_unchanged: usize,
    /// Songs whose fifteen legacy fields were all set.
    pub songs_fully_completed: usize,
}

impl BackfillReport {
    pub fn rows_written(&self) -> usize {
        self.rows_inserted + self.rows_updated
    }
}

pub struct BackfillService {
    legacy: Arc<dyn LegacyAuthoringSource>,
    progress: Arc<dyn ProgressRepository>,
    workflows: Arc<dyn WorkflowRepository>,
    songs: Arc<dyn SongRepository>,
    cache: Option<Arc<CompletionCache>>,
    policy: UncompletePolicy,
}

impl BackfillService {
    pub fn new(
        legacy: Arc<dyn LegacyAuthoringSource>,
        progress: Arc<dyn ProgressRepository>,
        workflows: Arc<dyn WorkflowRepository>,
        songs: Arc<dyn SongRepository>,
    ) -> Self {
        Self {
            legacy,
            progress,
            workflows,
            songs,
            cache: None,
            policy: UncompletePolicy::default(),
        }
    }

    pub fn with_cache(mut self, cache: Arc<CompletionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_policy(mut self, policy: UncompletePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn legacy_availability(&self) -> LegacyAvailability {
        self.legacy.availability()
    }

    pub async fn run(&self, options: BackfillOptions) -> DomainResult<BackfillReport> {
        if options.batch_size == 0 {
            return Err(DomainError::ValidationFailed("batch_size must be greater than 0".to_string()));
        }

        let mut report = BackfillReport {
            dry_run: options.dry_run,
            ..BackfillReport::default()
        };

        if !self.legacy.availability().is_available() {
            warn!("legacy authoring table unavailable; nothing to backfill");
            return Ok(report);
        }

        let now = Utc::now();
        let mut after = SongId::MIN;
        loop {
            let records = self.legacy.records_after(after, options.batch_size).await?;
            let Some(last) = records.last() else {
                break;
            };
            after = last.song_id;

            self.process_batch(&records, &options, now, &mut report).await?;
            report.batches += 1;

            if records.len() < options.batch_size {
                break;
            }
        }

        info!(
            dry_run = report.dry_run,
            batches = report.batches,
            scanned = report.songs_scanned,
            skipped = report.songs_skipped,
            inserted = report.rows_inserted,
            updated = report.rows_updated,
            unchanged = report.rows_unchanged,
            fully_completed = report.songs_fully_completed,
            "legacy backfill finished"
        );
        Ok(report)
    }

    async fn process_batch(
        &self,
        records: &[LegacyAuthoringRecord],
        options: &BackfillOptions,
        now: DateTime<Utc>,
        report: &mut BackfillReport,
    ) -> DomainResult<()> {
        let song_ids: Vec<SongId> = records.iter().map(|r| r.song_id).collect();

        let (owners, existing_rows) = tokio::try_join!(
            self.songs.owners_for_songs(&song_ids),
            self.progress.rows_for_songs(&song_ids),
        )?;

        // Owner workflows only matter for fully complete songs.
        let owner_ids: Vec<UserId> = records
            .iter()
            .filter(|r| r.is_fully_complete())
            .filter_map(|r| owners.get(&r.song_id).copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let workflows = if owner_ids.is_empty() {
            HashMap::new()
        } else {
            self.workflows.steps_for_users(&owner_ids).await?
        };

        let songs_with_rows: HashSet<SongId> = existing_rows.iter().map(|r| r.song_id).collect();
        let existing: HashMap<(SongId, &str), &SongProgress> = existing_rows
            .iter()
            .map(|row| ((row.song_id, row.step_name.as_str()), row))
            .collect();

        let mut writes = Vec::new();
        let mut touched = Vec::new();

        for record in records {
            report.songs_scanned += 1;

            let Some(owner) = owners.get(&record.song_id) else {
                warn!(song_id = record.song_id, "legacy record has no matching song; skipping");
                report.songs_skipped += 1;
                continue;
            };
            if options.only_missing && songs_with_rows.contains(&record.song_id) {
                report.songs_skipped += 1;
                continue;
            }

            let mut desired: Vec<(String, bool)> = record
                .fields()
                .iter()
                .map(|(step, done)| ((*step).to_string(), *done))
                .collect();

            if record.is_fully_complete() {
                report.songs_fully_completed += 1;
                if let Some(steps) = workflows.get(owner) {
                    desired.extend(
                        steps
                            .iter()
                            .filter(|s| !is_legacy_step(&s.step_name))
                            .map(|s| (s.step_name.clone(), true)),
                    );
                }
            }

            let writes_before = writes.len();
            for (step_name, done) in desired {
                match existing.get(&(record.song_id, step_name.as_str())) {
                    Some(row) if row.is_completed == done => report.rows_unchanged += 1,
                    Some(row) => {
                        writes.push(row.transition(done, None, now, self.policy));
                        report.rows_updated += 1;
                    }
                    None => {
                        writes.push(SongProgress::new(record.song_id, step_name, done, now));
                        report.rows_inserted += 1;
                    }
                }
            }
            if writes.len() > writes_before {
                touched.push(record.song_id);
            }
        }

        debug!(
            records = records.len(),
            planned_writes = writes.len(),
            dry_run = options.dry_run,
            "processed backfill batch"
        );

        if options.dry_run || writes.is_empty() {
            return Ok(());
        }

        self.progress.upsert(&writes).await?;
        if let Some(cache) = &self.cache {
            for song_id in touched {
                cache.invalidate_song(song_id);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryLegacyAuthoringSource, InMemoryProgressRepository, InMemorySongRepository, InMemoryWorkflowRepository,
    };
    use crate::domain::models::{CompletionMap, LegacyAvailability, SongRef, WorkflowStep};

    struct Fixture {
        legacy: Arc<InMemoryLegacyAuthoringSource>,
        progress: Arc<InMemoryProgressRepository>,
        workflows: Arc<InMemoryWorkflowRepository>,
        songs: Arc<InMemorySongRepository>,
    }

    impl Fixture {
        fn new(availability: LegacyAvailability) -> Self {
            Self {
                legacy: Arc::new(InMemoryLegacyAuthoringSource::new(availability)),
                progress: Arc::new(InMemoryProgressRepository::new()),
                workflows: Arc::new(InMemoryWorkflowRepository::new()),
                songs: Arc::new(InMemorySongRepository::new()),
            }
        }

        fn service(&self) -> BackfillService {
            BackfillService::new(
                self.legacy.clone(),
                self.progress.clone(),
                self.workflows.clone(),
                self.songs.clone(),
            )
        }

        async fn song(&self, id: SongId, owner: UserId, record: LegacyAuthoringRecord) {
            self.songs.put(SongRef::new(id, owner)).await;
            self.legacy.put(record).await;
        }
    }

    #[tokio::test]
    async fn test_backfill_writes_one_row_per_legacy_field() {
        let f = Fixture::new(LegacyAvailability::Available);
        f.song(1, 7, LegacyAuthoringRecord::new(1).with("drums", true)).await;

        let report = f.service().run(BackfillOptions::default()).await.unwrap();
        assert_eq!(report.songs_scanned, 1);
        assert_eq!(report.rows_inserted, 15);
        assert_eq!(report.batches, 1);

        let drums = f.progress.get(1, "drums").await.unwrap().unwrap();
        assert!(drums.is_completed);
        assert!(drums.completed_at.is_some());
        let bass = f.progress.get(1, "bass").await.unwrap().unwrap();
        assert!(!bass.is_completed);
        assert!(bass.completed_at.is_none());
    }

    #[tokio::test]
    async fn test_second_run_writes_nothing() {
        let f = Fixture::new(LegacyAvailability::Available);
        f.song(1, 7, LegacyAuthoringRecord::new(1).with("drums", true)).await;
        f.song(2, 7, LegacyAuthoringRecord::all_complete(2)).await;

        let service = f.service();
        let first = service.run(BackfillOptions::default()).await.unwrap();
        let before = f.progress.rows_for_songs(&[1, 2]).await.unwrap();

        let second = service.run(BackfillOptions::default()).await.unwrap();
        let after = f.progress.rows_for_songs(&[1, 2]).await.unwrap();

        assert_eq!(first.rows_written(), 30);
        assert_eq!(second.rows_written(), 0);
        assert_eq!(second.rows_unchanged, 30);
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_fully_complete_song_completes_extra_workflow_steps() {
        let f = Fixture::new(LegacyAvailability::Available);
        f.workflows
            .put_steps(
                7,
                vec![
                    WorkflowStep::new("drums", "Drums", 0),
                    WorkflowStep::new("mixing", "Mixing", 1),
                    WorkflowStep::new("mastering", "Mastering", 2),
                ],
            )
            .await;
        f.song(1, 7, LegacyAuthoringRecord::all_complete(1)).await;
        f.song(2, 7, LegacyAuthoringRecord::all_complete(2).with("keys", false)).await;

        let report = f.service().run(BackfillOptions::default()).await.unwrap();
        assert_eq!(report.songs_fully_completed, 1);
        assert_eq!(report.rows_inserted, 15 + 2 + 15);

        assert!(f.progress.get(1, "mixing").await.unwrap().unwrap().is_completed);
        assert!(f.progress.get(1, "mastering").await.unwrap().unwrap().is_completed);
        assert!(f.progress.get(2, "mixing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_changed_legacy_value_updates_row() {
        let f = Fixture::new(LegacyAvailability::Available);
        f.song(1, 7, LegacyAuthoringRecord::new(1)).await;
        let service = f.service();
        service.run(BackfillOptions::default()).await.unwrap();

        f.legacy.put(LegacyAuthoringRecord::new(1).with("bass", true)).await;
        let report = service.run(BackfillOptions::default()).await.unwrap();

        assert_eq!(report.rows_updated, 1);
        assert_eq!(report.rows_unchanged, 14);
        assert!(f.progress.get(1, "bass").await.unwrap().unwrap().completed_at.is_some());
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let f = Fixture::new(LegacyAvailability::Available);
        f.song(1, 7, LegacyAuthoringRecord::all_complete(1)).await;

        let options = BackfillOptions {
            dry_run: true,
            ..BackfillOptions::default()
        };
        let report = f.service().run(options).await.unwrap();

        assert!(report.dry_run);
        assert_eq!(report.rows_inserted, 15);
        assert_eq!(f.progress.rows_written(), 0);
    }

    #[tokio::test]
    async fn test_only_missing_skips_songs_with_rows() {
        let f = Fixture::new(LegacyAvailability::Available);
        f.song(1, 7, LegacyAuthoringRecord::all_complete(1)).await;
        f.song(2, 7, LegacyAuthoringRecord::all_complete(2)).await;
        f.progress
            .upsert(&[SongProgress::new(1, "drums", false, Utc::now())])
            .await
            .unwrap();

        let options = BackfillOptions {
            only_missing: true,
            ..BackfillOptions::default()
        };
        let report = f.service().run(options).await.unwrap();

        assert_eq!(report.songs_skipped, 1);
        assert_eq!(report.rows_inserted, 15);
        assert!(!f.progress.get(1, "drums").await.unwrap().unwrap().is_completed);
    }

    #[tokio::test]
    async fn test_pages_through_all_records() {
        let f = Fixture::new(LegacyAvailability::Available);
        for id in 1..=7 {
            f.song(id, 1, LegacyAuthoringRecord::new(id)).await;
        }

        let options = BackfillOptions {
            batch_size: 3,
            ..BackfillOptions::default()
        };
        let report = f.service().run(options).await.unwrap();

        assert_eq!(report.batches, 3);
        assert_eq!(report.songs_scanned, 7);
    }

    #[tokio::test]
    async fn test_orphan_record_is_skipped() {
        let f = Fixture::new(LegacyAvailability::Available);
        f.legacy.put(LegacyAuthoringRecord::all_complete(5)).await;

        let report = f.service().run(BackfillOptions::default()).await.unwrap();
        assert_eq!(report.songs_skipped, 1);
        assert_eq!(report.rows_written(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_legacy_is_a_noop() {
        let f = Fixture::new(LegacyAvailability::Unavailable);
        let report = f.service().run(BackfillOptions::default()).await.unwrap();
        assert_eq!(report, BackfillReport::default());
    }

    #[tokio::test]
    async fn test_zero_batch_size_rejected() {
        let f = Fixture::new(LegacyAvailability::Available);
        let options = BackfillOptions {
            batch_size: 0,
            ..BackfillOptions::default()
        };
        assert!(matches!(f.service().run(options).await, Err(DomainError::ValidationFailed(_))));
    }

    #[tokio::test]
    async fn test_backfill_invalidates_touched_songs() {
        let f = Fixture::new(LegacyAvailability::Available);
        f.song(1, 7, LegacyAuthoringRecord::new(1)).await;
        let cache = Arc::new(CompletionCache::default());
        cache.set(&[1], false, CompletionMap::new(), None);
        cache.set(&[3], false, CompletionMap::new(), None);

        f.service().with_cache(cache.clone()).run(BackfillOptions::default()).await.unwrap();
        assert!(cache.get(&[1], false).is_none());
        assert!(cache.get(&[3], false).is_some());
    }
}
