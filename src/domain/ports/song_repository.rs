//! Song repository port.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::domain::errors::DomainResult;
use crate::domain::models::{SongId, SongRef, UserId};

/// Song ownership lookups. Song CRUD lives outside this crate.
#[async_trait]
pub trait SongRepository: Send + Sync {
    /// Owner of each song, in one batched read. Unknown songs are omitted.
    async fn owners_for_songs(&self, song_ids: &[SongId]) -> DomainResult<HashMap<SongId, UserId>>;

    /// All songs owned by a user.
    async fn songs_for_user(&self, user_id: UserId) -> DomainResult<Vec<SongRef>>;

    /// Resolve song ids into [`SongRef`]s, preserving input order and skipping unknown ids.
    async fn resolve(&self, song_ids: &[SongId]) -> DomainResult<Vec<SongRef>> {
        let owners = self.owners_for_songs(song_ids).await?;
        Ok(song_ids
            .iter()
            .filter_map(|id| owners.get(id).map(|owner| SongRef::new(*id, *owner)))
            .collect())
    }
}
