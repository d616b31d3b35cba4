//! End-to-end completion over a migrated SQLite database.

mod common;

use common::{context, migrated_pool, seed_authoring, seed_song, seed_user};
use trackflow::{LegacyAvailability, SongRef, StepSpec};

fn specs(names: &[&str]) -> Vec<StepSpec> {
    names.iter().map(|n| StepSpec::named(*n)).collect()
}

#[tokio::test]
async fn test_partial_progress_against_owner_workflow() {
    let pool = migrated_pool().await;
    seed_user(&pool, 7).await;
    seed_song(&pool, 1, 7).await;
    let ctx = context(&pool).await;

    ctx.workflow_service()
        .customize(7, specs(&["tempo_map", "drums", "bass"]))
        .await
        .unwrap();
    let progress = ctx.progress_service();
    progress.set_step_completion(1, "tempo_map", true, None).await.unwrap();
    progress.set_step_completion(1, "drums", false, None).await.unwrap();

    let songs = ctx.songs().resolve(&[1]).await.unwrap();
    let results = ctx.completion_service().completion_for(&songs, true).await.unwrap();
    let result = &results[&1];

    assert_eq!(result.completion, Some(33));
    assert_eq!(result.remaining_steps, vec!["Drums", "Bass"]);
    assert_eq!(result.workflow_fields, vec!["tempo_map", "drums", "bass"]);
}

#[tokio::test]
async fn test_no_workflow_no_progress_no_legacy_is_zero_of_default() {
    let pool = migrated_pool().await;
    seed_user(&pool, 7).await;
    seed_song(&pool, 1, 7).await;
    let ctx = context(&pool).await;

    let results = ctx
        .completion_service()
        .completion_for(&[SongRef::new(1, 7)], false)
        .await
        .unwrap();

    assert_eq!(results[&1].completion, Some(0));
    assert_eq!(results[&1].workflow_fields.len(), 15);
}

#[tokio::test]
async fn test_legacy_fallback_and_owner_workflow() {
    let pool = migrated_pool().await;
    seed_user(&pool, 1).await;
    seed_user(&pool, 2).await;
    seed_song(&pool, 10, 1).await;
    seed_song(&pool, 20, 2).await;
    seed_authoring(&pool, 10, &["demucs", "midi", "drums"]).await;
    seed_authoring(&pool, 20, &["drums"]).await;
    let ctx = context(&pool).await;
    ctx.workflow_service().customize(2, specs(&["drums", "bass"])).await.unwrap();

    let songs = ctx.songs().resolve(&[10, 20]).await.unwrap();
    let results = ctx.completion_service().completion_for(&songs, true).await.unwrap();

    assert_eq!(results[&10].completion, Some(20));
    assert_eq!(results[&20].completion, Some(50));
    assert_eq!(results[&20].remaining_steps, vec!["Bass"]);
}

#[tokio::test]
async fn test_dynamic_row_blocks_legacy_fallback() {
    let pool = migrated_pool().await;
    seed_user(&pool, 1).await;
    seed_song(&pool, 10, 1).await;
    seed_authoring(&pool, 10, &["demucs", "midi", "drums"]).await;
    let ctx = context(&pool).await;

    ctx.progress_service()
        .set_step_completion(10, "compile", false, None)
        .await
        .unwrap();
    let results = ctx
        .completion_service()
        .completion_for(&[SongRef::new(10, 1)], false)
        .await
        .unwrap();

    assert_eq!(results[&10].completion, Some(0));
}

#[tokio::test]
async fn test_dropped_legacy_table_reads_as_unavailable() {
    let pool = migrated_pool().await;
    seed_user(&pool, 1).await;
    seed_song(&pool, 10, 1).await;
    sqlx::query("DROP TABLE authoring").execute(&pool).await.unwrap();
    let ctx = context(&pool).await;

    assert_eq!(ctx.backfill_service().legacy_availability(), LegacyAvailability::Unavailable);
    let results = ctx
        .completion_service()
        .completion_for(&[SongRef::new(10, 1)], false)
        .await
        .unwrap();
    assert_eq!(results[&10].completion, Some(0));
}

#[tokio::test]
async fn test_empty_workflow_is_undefined() {
    let pool = migrated_pool().await;
    seed_user(&pool, 1).await;
    seed_song(&pool, 10, 1).await;
    seed_authoring(&pool, 10, &["demucs"]).await;
    let ctx = context(&pool).await;

    ctx.workflow_service().customize(1, Vec::new()).await.unwrap();
    let results = ctx
        .completion_service()
        .completion_for(&[SongRef::new(10, 1)], true)
        .await
        .unwrap();

    assert_eq!(results[&10].completion, None);
    assert!(results[&10].workflow_fields.is_empty());
}

#[tokio::test]
async fn test_progress_update_is_visible_through_cache() {
    let pool = migrated_pool().await;
    seed_user(&pool, 1).await;
    seed_song(&pool, 10, 1).await;
    let ctx = context(&pool).await;
    ctx.workflow_service().customize(1, specs(&["drums", "bass"])).await.unwrap();

    let completion = ctx.completion_service();
    let songs = [SongRef::new(10, 1)];
    assert_eq!(completion.completion_for(&songs, false).await.unwrap()[&10].completion, Some(0));

    ctx.progress_service().set_step_completion(10, "drums", true, None).await.unwrap();
    assert_eq!(completion.completion_for(&songs, false).await.unwrap()[&10].completion, Some(50));

    ctx.workflow_service().customize(1, specs(&["drums"])).await.unwrap();
    assert_eq!(completion.completion_for(&songs, false).await.unwrap()[&10].completion, Some(100));
}

#[tokio::test]
async fn test_onboarding_clones_default_template() {
    let pool = migrated_pool().await;
    seed_user(&pool, 3).await;
    let ctx = context(&pool).await;

    let workflow = ctx.workflow_service().ensure_user_workflow(3, None).await.unwrap();
    assert_eq!(workflow.steps.len(), 15);
    assert_eq!(workflow.steps[2].display_name, "Tempo Map");

    let again = ctx.workflow_service().ensure_user_workflow(3, None).await.unwrap();
    assert_eq!(again.id, workflow.id);
}
