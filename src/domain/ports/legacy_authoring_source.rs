//! Legacy authoring source port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{LegacyAuthoringRecord, LegacyAvailability, SongId};

/// Read access to the legacy fixed-column authoring table.
#[async_trait]
pub trait LegacyAuthoringSource: Send + Sync {
    /// Whether the legacy table exists. Fixed for the lifetime of the source.
    fn availability(&self) -> LegacyAvailability;

    /// Legacy records for the given songs, in one batched read.
    async fn records_for_songs(&self, song_ids: &[SongId]) -> DomainResult<Vec<LegacyAuthoringRecord>>;

    /// Page through every record ordered by song id, starting after `after_song_id`.
    async fn records_after(&self, after_song_id: SongId, limit: usize) -> DomainResult<Vec<LegacyAuthoringRecord>>;
}
