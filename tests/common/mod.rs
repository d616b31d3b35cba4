//! Common test utilities for integration tests
//!
//! Seeds a migrated in-memory database and wires the services over it.

#![allow(dead_code)]

use sqlx::SqlitePool;
use trackflow::adapters::sqlite::create_migrated_test_pool;
use trackflow::cli::AppContext;
use trackflow::Config;

pub async fn migrated_pool() -> SqlitePool {
    create_migrated_test_pool().await.expect("failed to create migrated pool")
}

pub async fn context(pool: &SqlitePool) -> AppContext {
    AppContext::from_pool(Config::default(), pool.clone()).await
}

pub async fn seed_user(pool: &SqlitePool, id: i64) {
    sqlx::query("INSERT INTO users (id, username) VALUES (?, ?)")
        .bind(id)
        .bind(format!("user{id}"))
        .execute(pool)
        .await
        .expect("failed to seed user");
}

pub async fn seed_song(pool: &SqlitePool, id: i64, user_id: i64) {
    sqlx::query("INSERT INTO songs (id, user_id, title) VALUES (?, ?, ?)")
        .bind(id)
        .bind(user_id)
        .bind(format!("Song {id}"))
        .execute(pool)
        .await
        .expect("failed to seed song");
}

/// Insert a legacy authoring row with the named columns set and the rest false.
///
/// `fields` must be legacy column names.
pub async fn seed_authoring(pool: &SqlitePool, song_id: i64, fields: &[&str]) {
    sqlx::query("INSERT INTO authoring (song_id) VALUES (?)")
        .bind(song_id)
        .execute(pool)
        .await
        .expect("failed to seed authoring row");

    for field in fields {
        assert!(trackflow::domain::models::is_legacy_step(field), "not a legacy column: {field}");
        sqlx::query(&format!("UPDATE authoring SET {field} = 1 WHERE song_id = ?"))
            .bind(song_id)
            .execute(pool)
            .await
            .expect("failed to set authoring flag");
    }
}

pub async fn progress_row_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM song_progress")
        .fetch_one(pool)
        .await
        .expect("failed to count progress rows")
}
