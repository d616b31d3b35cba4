//! Service wiring shared by every command.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::adapters::cache::CompletionCache;
use crate::adapters::sqlite::{
    initialize_database, PoolConfig, SqliteLegacyAuthoringRepository, SqliteProgressRepository,
    SqliteSongRepository, SqliteWorkflowRepository,
};
use crate::domain::models::Config;
use crate::domain::ports::{
    LegacyAuthoringSource, LegacyDefaultWorkflow, ProgressRepository, SongRepository, WorkflowRepository,
};
use crate::services::{
    BackfillService, CompletionCalculator, CompletionService, LegacyBridge, ProgressService, WorkflowService,
};

/// Opened stores plus the process-wide completion cache.
pub struct AppContext {
    pub config: Config,
    pub pool: SqlitePool,
    workflows: Arc<dyn WorkflowRepository>,
    progress: Arc<dyn ProgressRepository>,
    songs: Arc<dyn SongRepository>,
    legacy: Arc<dyn LegacyAuthoringSource>,
    cache: Option<Arc<CompletionCache>>,
}

impl AppContext {
    /// Open (creating if needed) and migrate the configured database.
    pub async fn open(config: Config) -> Result<Self> {
        let pool = initialize_database(&config.database.url(), Some(PoolConfig::from(&config.database)))
            .await
            .with_context(|| format!("Failed to open database at {}", config.database.path))?;
        Ok(Self::from_pool(config, pool).await)
    }

    /// Wire services over an already migrated pool.
    pub async fn from_pool(config: Config, pool: SqlitePool) -> Self {
        let legacy = SqliteLegacyAuthoringRepository::open(pool.clone()).await;
        let cache = config
            .cache
            .enabled
            .then(|| Arc::new(CompletionCache::from_config(&config.cache)));

        Self {
            workflows: Arc::new(SqliteWorkflowRepository::new(pool.clone())),
            progress: Arc::new(SqliteProgressRepository::new(pool.clone())),
            songs: Arc::new(SqliteSongRepository::new(pool.clone())),
            legacy: Arc::new(legacy),
            cache,
            config,
            pool,
        }
    }

    pub fn songs(&self) -> Arc<dyn SongRepository> {
        Arc::clone(&self.songs)
    }

    pub fn completion_service(&self) -> CompletionService {
        let calculator = CompletionCalculator::new(
            Arc::clone(&self.workflows),
            Arc::clone(&self.progress),
            LegacyBridge::new(Arc::clone(&self.legacy)),
            Arc::new(LegacyDefaultWorkflow),
        );
        match &self.cache {
            Some(cache) => CompletionService::new(calculator, Arc::clone(cache)),
            None => CompletionService::uncached(calculator),
        }
    }

    pub fn progress_service(&self) -> ProgressService {
        let service = ProgressService::new(Arc::clone(&self.progress), Arc::clone(&self.songs))
            .with_policy(self.config.progress.uncomplete_policy);
        match &self.cache {
            Some(cache) => service.with_cache(Arc::clone(cache)),
            None => service,
        }
    }

    pub fn workflow_service(&self) -> WorkflowService {
        let service = WorkflowService::new(Arc::clone(&self.workflows), Arc::clone(&self.songs));
        match &self.cache {
            Some(cache) => service.with_cache(Arc::clone(cache)),
            None => service,
        }
    }

    pub fn backfill_service(&self) -> BackfillService {
        let service = BackfillService::new(
            Arc::clone(&self.legacy),
            Arc::clone(&self.progress),
            Arc::clone(&self.workflows),
            Arc::clone(&self.songs),
        )
        .with_policy(self.config.progress.uncomplete_policy);
        match &self.cache {
            Some(cache) => service.with_cache(Arc::clone(cache)),
            None => service,
        }
    }
}
