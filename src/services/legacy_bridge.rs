//! Read-only view of legacy authoring records through the dynamic step model.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::models::{LegacyAvailability, ProgressMap, SongId};
use crate::domain::ports::LegacyAuthoringSource;

/// Synthesizes step progress from legacy records. Never fails.
#[derive(Clone)]
pub struct LegacyBridge {
    source: Arc<dyn LegacyAuthoringSource>,
}

impl LegacyBridge {
    pub fn new(source: Arc<dyn LegacyAuthoringSource>) -> Self {
        Self { source }
    }

    pub fn availability(&self) -> LegacyAvailability {
        self.source.availability()
    }

    /// Legacy progress for the given songs. Songs without a record are omitted.
    ///
    /// An unavailable source yields an empty map without querying. A read
    /// failure is logged and also yields an empty map.
    pub async fn progress_for_songs(&self, song_ids: &[SongId]) -> ProgressMap {
        if song_ids.is_empty() {
            return HashMap::new();
        }
        if !self.source.availability().is_available() {
            debug!(songs = song_ids.len(), "legacy authoring unavailable; skipping fallback");
            return HashMap::new();
        }

        match self.source.records_for_songs(song_ids).await {
            Ok(records) => records
                .into_iter()
                .map(|record| (record.song_id, record.to_progress()))
                .collect(),
            Err(e) => {
                warn!(
                    error = %e,
                    songs = song_ids.len(),
                    "legacy authoring lookup failed; treating songs as having no legacy progress"
                );
                HashMap::new()
            }
        }
    }
}
