//! SQLite implementation of the SongRepository.

use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::HashMap;

use crate::adapters::sqlite::{distinct_ids, ID_CHUNK_SIZE};
use crate::domain::errors::DomainResult;
use crate::domain::models::{SongId, SongRef, UserId};
use crate::domain::ports::SongRepository;

#[derive(Clone)]
pub struct SqliteSongRepository {
    pool: SqlitePool,
}

impl SqliteSongRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SongRepository for SqliteSongRepository {
    async fn owners_for_songs(&self, song_ids: &[SongId]) -> DomainResult<HashMap<SongId, UserId>> {
        let mut owners = HashMap::new();

        for chunk in distinct_ids(song_ids).chunks(ID_CHUNK_SIZE) {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT id, user_id FROM songs WHERE id IN (");
            let mut separated = builder.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
            separated.push_unseparated(")");

            let rows: Vec<(i64, i64)> = builder.build_query_as().fetch_all(&self.pool).await?;
            owners.extend(rows);
        }

        Ok(owners)
    }

    async fn songs_for_user(&self, user_id: UserId) -> DomainResult<Vec<SongRef>> {
        let rows: Vec<(i64, i64)> = sqlx::query_as("SELECT id, user_id FROM songs WHERE user_id = ? ORDER BY id")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|(id, owner)| SongRef::new(id, owner)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;
    use crate::adapters::sqlite::test_support::{seed_song, seed_user};

    #[tokio::test]
    async fn test_owner_lookups() {
        let pool = create_migrated_test_pool().await.unwrap();
        seed_user(&pool, 1).await;
        seed_user(&pool, 2).await;
        seed_song(&pool, 10, 1).await;
        seed_song(&pool, 11, 1).await;
        seed_song(&pool, 20, 2).await;
        let repo = SqliteSongRepository::new(pool);

        let owners = repo.owners_for_songs(&[10, 20, 99]).await.unwrap();
        assert_eq!(owners.len(), 2);
        assert_eq!(owners[&10], 1);
        assert_eq!(owners[&20], 2);

        let resolved = repo.resolve(&[20, 99, 10]).await.unwrap();
        assert_eq!(resolved, vec![SongRef::new(20, 2), SongRef::new(10, 1)]);

        let songs = repo.songs_for_user(1).await.unwrap();
        assert_eq!(songs, vec![SongRef::new(10, 1), SongRef::new(11, 1)]);
    }
}
