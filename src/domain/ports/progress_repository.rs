//! Progress repository port.

use async_trait::async_trait;
use tracing::warn;

use crate::domain::errors::DomainResult;
use crate::domain::models::{collapse_progress_rows, ProgressMap, SongId, SongProgress};

/// Repository interface for per-song, per-step progress rows.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// All progress rows for the given songs, in one batched read.
    async fn rows_for_songs(&self, song_ids: &[SongId]) -> DomainResult<Vec<SongProgress>>;

    /// Get one row by its `(song_id, step_name)` key.
    async fn get(&self, song_id: SongId, step_name: &str) -> DomainResult<Option<SongProgress>>;

    /// Insert or update rows keyed on `(song_id, step_name)` atomically.
    ///
    /// Returns the number of rows written.
    async fn upsert(&self, rows: &[SongProgress]) -> DomainResult<u64>;

    /// Completion flags per song. Songs without rows are omitted.
    async fn progress_for_songs(&self, song_ids: &[SongId]) -> DomainResult<ProgressMap> {
        let rows = self.rows_for_songs(song_ids).await?;
        let (map, missing_timestamps) = collapse_progress_rows(rows);
        if missing_timestamps > 0 {
            warn!(
                rows = missing_timestamps,
                "progress rows marked completed without completed_at; counting them as completed"
            );
        }
        Ok(map)
    }
}
