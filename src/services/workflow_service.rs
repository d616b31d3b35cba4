//! Workflow onboarding and customization.

use std::sync::Arc;
use tracing::{debug, info};

use crate::adapters::cache::CompletionCache;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{StepSpec, UserId, UserWorkflow, WorkflowTemplate};
use crate::domain::ports::{SongRepository, WorkflowRepository};

pub struct WorkflowService {
    workflows: Arc<dyn WorkflowRepository>,
    songs: Arc<dyn SongRepository>,
    cache: Option<Arc<CompletionCache>>,
}

impl WorkflowService {
    pub fn new(workflows: Arc<dyn WorkflowRepository>, songs: Arc<dyn SongRepository>) -> Self {
        Self {
            workflows,
            songs,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<CompletionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub async fn get(&self, user_id: UserId) -> DomainResult<Option<UserWorkflow>> {
        self.workflows.get_for_user(user_id).await
    }

    pub async fn list_templates(&self) -> DomainResult<Vec<WorkflowTemplate>> {
        self.workflows.list_templates().await
    }

    /// Give the user a workflow cloned from a template if they have none.
    ///
    /// `template_name` of `None` uses the default template. An existing
    /// workflow is returned unchanged.
    pub async fn ensure_user_workflow(&self, user_id: UserId, template_name: Option<&str>) -> DomainResult<UserWorkflow> {
        if let Some(existing) = self.workflows.get_for_user(user_id).await? {
            debug!(user_id, "user already has a workflow");
            return Ok(existing);
        }

        let template = match template_name {
            Some(name) => self.workflows.get_template_by_name(name).await?,
            None => self.workflows.get_default_template().await?,
        }
        .ok_or_else(|| DomainError::TemplateNotFound(template_name.unwrap_or("default").to_string()))?;

        let workflow = UserWorkflow::from_template(user_id, &template);
        let saved = self.workflows.save(&workflow).await?;
        info!(user_id, template = %template.name, steps = saved.steps.len(), "created user workflow");

        self.invalidate_user_songs(user_id).await?;
        Ok(saved)
    }

    /// Replace the user's step list. Position in `specs` becomes `order_index`.
    ///
    /// Creates the workflow when the user has none.
    pub async fn customize(&self, user_id: UserId, specs: Vec<StepSpec>) -> DomainResult<UserWorkflow> {
        let workflow = match self.workflows.get_for_user(user_id).await? {
            Some(mut existing) => {
                existing.replace_steps(specs)?;
                existing
            }
            None => UserWorkflow::custom(user_id, "custom", specs)?,
        };

        let saved = self.workflows.save(&workflow).await?;
        info!(user_id, steps = saved.steps.len(), "customized user workflow");

        self.invalidate_user_songs(user_id).await?;
        Ok(saved)
    }

    async fn invalidate_user_songs(&self, user_id: UserId) -> DomainResult<()> {
        let Some(cache) = &self.cache else {
            return Ok(());
        };

        let songs = self.songs.songs_for_user(user_id).await?;
        let dropped: usize = songs.iter().map(|song| cache.invalidate_song(song.id)).sum();
        debug!(user_id, songs = songs.len(), dropped, "invalidated completion cache after workflow edit");
        Ok(())
    }
}
