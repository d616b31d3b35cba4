//! Song identity as seen by the completion engine.

use serde::{Deserialize, Serialize};

/// Integer primary key of a song.
pub type SongId = i64;

/// Integer primary key of a user.
pub type UserId = i64;

/// A song whose completion is requested.
///
/// Completion is always computed against the owner's workflow, never the
/// viewer's, so the owner travels with the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SongRef {
    pub id: SongId,
    pub owner_user_id: UserId,
}

impl SongRef {
    pub fn new(id: SongId, owner_user_id: UserId) -> Self {
        Self { id, owner_user_id }
    }
}
