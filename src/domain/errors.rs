//! Domain errors for the TrackFlow completion engine.

use thiserror::Error;

use crate::domain::models::{SongId, UserId};

/// Domain-level errors that can occur in the completion engine.
///
/// Absent data (a user without a workflow, a song without progress, a
/// deployment without the legacy authoring table) is never an error here;
/// those cases resolve to empty results.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Song not found: {0}")]
    SongNotFound(SongId),

    #[error("Workflow not found for user: {0}")]
    WorkflowNotFound(UserId),

    #[error("Workflow template not found: {0}")]
    TemplateNotFound(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
