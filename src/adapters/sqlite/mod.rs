//! SQLite database adapters for the TrackFlow completion engine.

pub mod connection;
pub mod legacy_authoring_repository;
pub mod migrations;
pub mod progress_repository;
pub mod song_repository;
pub mod workflow_repository;

pub use connection::{create_pool, create_test_pool, verify_connection, ConnectionError, PoolConfig};
pub use legacy_authoring_repository::SqliteLegacyAuthoringRepository;
pub use migrations::{all_embedded_migrations, Migration, MigrationError, Migrator};
pub use progress_repository::SqliteProgressRepository;
pub use song_repository::SqliteSongRepository;
pub use workflow_repository::SqliteWorkflowRepository;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};

/// Largest id list bound into a single `IN (...)` clause.
pub(crate) const ID_CHUNK_SIZE: usize = 500;

/// Sorted, deduplicated copy of an id list.
pub(crate) fn distinct_ids(ids: &[i64]) -> Vec<i64> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Parse an RFC3339 datetime string from a SQLite row field.
pub fn parse_datetime(s: &str) -> DomainResult<DateTime<Utc>> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map_err(|e| DomainError::SerializationError(e.to_string()))
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse an optional RFC3339 datetime string from a SQLite row field.
pub fn parse_optional_datetime(s: Option<String>) -> DomainResult<Option<DateTime<Utc>>> {
    s.map(|s| chrono::DateTime::parse_from_rfc3339(&s).map(|d| d.with_timezone(&Utc)))
        .transpose()
        .map_err(|e| DomainError::SerializationError(e.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),
    #[error("Migration error: {0}")]
    Migration(#[from] MigrationError),
    #[error("Query error: {0}")]
    Query(#[from] sqlx::Error),
}

pub async fn initialize_database(database_url: &str, config: Option<PoolConfig>) -> Result<SqlitePool, DatabaseError> {
    let pool = create_pool(database_url, config).await?;
    let migrator = Migrator::new(pool.clone());
    migrator.run_embedded_migrations(all_embedded_migrations()).await?;
    Ok(pool)
}

pub async fn initialize_default_database() -> Result<SqlitePool, DatabaseError> {
    initialize_database("sqlite:.trackflow/trackflow.db", None).await
}

/// Create an in-memory test pool with all migrations applied.
pub async fn create_migrated_test_pool() -> Result<SqlitePool, DatabaseError> {
    let pool = create_test_pool().await?;
    let migrator = Migrator::new(pool.clone());
    migrator.run_embedded_migrations(all_embedded_migrations()).await?;
    Ok(pool)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinct_ids() {
        assert_eq!(distinct_ids(&[3, 1, 3, 2, 1]), vec![1, 2, 3]);
        assert!(distinct_ids(&[]).is_empty());
    }

    #[test]
    fn test_parse_optional_datetime() {
        assert!(parse_optional_datetime(None).unwrap().is_none());
        let parsed = parse_optional_datetime(Some("2026-03-01T12:00:00+00:00".to_string())).unwrap();
        assert_eq!(parsed.unwrap().to_rfc3339(), "2026-03-01T12:00:00+00:00");
        assert!(parse_datetime("not a date").is_err());
    }
}
