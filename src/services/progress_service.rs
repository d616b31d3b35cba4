//! Progress mutation path.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

use crate::adapters::cache::CompletionCache;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{validate_step_name, SongId, SongProgress, UncompletePolicy};
use crate::domain::ports::{ProgressRepository, SongRepository};

pub struct ProgressService {
    progress: Arc<dyn ProgressRepository>,
    songs: Arc<dyn SongRepository>,
    cache: Option<Arc<CompletionCache>>,
    policy: UncompletePolicy,
}

impl ProgressService {
    pub fn new(progress: Arc<dyn ProgressRepository>, songs: Arc<dyn SongRepository>) -> Self {
        Self {
            progress,
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

    /// Mark one step of one song done or not done.
    ///
    /// The song's cached completion is invalidated before this returns.
    /// `notes` of `None` keeps any existing notes.
    pub async fn set_step_completion(
        &self,
        song_id: SongId,
        step_name: &str,
        completed: bool,
        notes: Option<String>,
    ) -> DomainResult<SongProgress> {
        validate_step_name(step_name)?;

        let owners = self.songs.owners_for_songs(&[song_id]).await?;
        if !owners.contains_key(&song_id) {
            return Err(DomainError::SongNotFound(song_id));
        }

        let now = Utc::now();
        let row = match self.progress.get(song_id, step_name).await? {
            Some(existing) => existing.transition(completed, notes, now, self.policy),
            None => SongProgress::new(song_id, step_name, completed, now).with_notes(notes),
        };

        self.progress.upsert(std::slice::from_ref(&row)).await?;
        self.clear_cache_for_song(song_id);

        info!(song_id, step = step_name, completed, "updated song progress");
        Ok(row)
    }

    /// Drop cached completion entries that mention `song_id`.
    pub fn clear_cache_for_song(&self, song_id: SongId) -> usize {
        match &self.cache {
            Some(cache) => {
                let dropped = cache.invalidate_song(song_id);
                debug!(song_id, dropped, "cleared completion cache");
                dropped
            }
            None => 0,
        }
    }
}
