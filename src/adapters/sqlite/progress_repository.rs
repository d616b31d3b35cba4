//! SQLite implementation of the ProgressRepository.

use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::adapters::sqlite::{distinct_ids, parse_datetime, parse_optional_datetime, ID_CHUNK_SIZE};
use crate::domain::errors::DomainResult;
use crate::domain::models::{SongId, SongProgress};
use crate::domain::ports::ProgressRepository;

#[derive(Clone)]
pub struct SqliteProgressRepository {
    pool: SqlitePool,
}

impl SqliteProgressRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProgressRepository for SqliteProgressRepository {
    async fn rows_for_songs(&self, song_ids: &[SongId]) -> DomainResult<Vec<SongProgress>> {
        let mut progress = Vec::new();

        for chunk in distinct_ids(song_ids).chunks(ID_CHUNK_SIZE) {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
                "SELECT song_id, step_name, is_completed, completed_at, notes, updated_at
                 FROM song_progress WHERE song_id IN (",
            );
            let mut separated = builder.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
            separated.push_unseparated(") ORDER BY song_id, step_name");

            let rows: Vec<ProgressRow> = builder.build_query_as().fetch_all(&self.pool).await?;
            for row in rows {
                progress.push(row.try_into()?);
            }
        }

        Ok(progress)
    }

    async fn get(&self, song_id: SongId, step_name: &str) -> DomainResult<Option<SongProgress>> {
        let row: Option<ProgressRow> = sqlx::query_as(
            "SELECT song_id, step_name, is_completed, completed_at, notes, updated_at
             FROM song_progress WHERE song_id = ? AND step_name = ?",
        )
        .bind(song_id)
        .bind(step_name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.try_into()).transpose()
    }

    async fn upsert(&self, rows: &[SongProgress]) -> DomainResult<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut written = 0;

        for row in rows {
            let result = sqlx::query(
                r#"INSERT INTO song_progress (song_id, step_name, is_completed, completed_at, notes, updated_at)
                   VALUES (?, ?, ?, ?, ?, ?)
                   ON CONFLICT(song_id, step_name) DO UPDATE SET
                       is_completed = excluded.is_completed,
                       completed_at = excluded.completed_at,
                       notes = excluded.notes,
                       updated_at = excluded.updated_at"#,
            )
            .bind(row.song_id)
            .bind(&row.step_name)
            .bind(row.is_completed)
            .bind(row.completed_at.map(|t| t.to_rfc3339()))
            .bind(&row.notes)
            .bind(row.updated_at.to_rfc3339())
            .execute(&mut *tx)
            .await?;
            written += result.rows_affected();
        }

        tx.commit().await?;
        Ok(written)
    }
}

#[derive(sqlx::FromRow)]
struct ProgressRow {
    song_id: i64,
    step_name: String,
    is_completed: bool,
    completed_at: Option<String>,
    notes: Option<String>,
    updated_at: String,
}

impl TryFrom<ProgressRow> for SongProgress {
    type Error = crate::domain::errors::DomainError;

    fn try_from(row: ProgressRow) -> Result<Self, Self::Error> {
        Ok(SongProgress {
            song_id: row.song_id,
            step_name: row.step_name,
            is_completed: row.is_completed,
            completed_at: parse_optional_datetime(row.completed_at)?,
            notes: row.notes,
            updated_at: parse_datetime(&row.updated_at)?,
        })
    }
}
