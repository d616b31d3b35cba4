//! Workflow repository port.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::domain::errors::DomainResult;
use crate::domain::models::{UserId, UserWorkflow, WorkflowStep, WorkflowTemplate};

/// Repository interface for user workflows and workflow templates.
#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    // -- Workflow definitions --

    /// Ordered steps of each user's workflow, in one batched read.
    ///
    /// Users without a workflow are omitted from the map; that is not an error.
    async fn steps_for_users(&self, user_ids: &[UserId]) -> DomainResult<HashMap<UserId, Vec<WorkflowStep>>>;

    /// Get a user's workflow with its steps.
    async fn get_for_user(&self, user_id: UserId) -> DomainResult<Option<UserWorkflow>>;

    /// Insert or replace a user's workflow and its full step list.
    ///
    /// Returns the stored workflow with its row id filled in.
    async fn save(&self, workflow: &UserWorkflow) -> DomainResult<UserWorkflow>;

    // -- Templates --

    /// Get a template by name.
    async fn get_template_by_name(&self, name: &str) -> DomainResult<Option<WorkflowTemplate>>;

    /// Get the template flagged as default.
    async fn get_default_template(&self) -> DomainResult<Option<WorkflowTemplate>>;

    /// List all templates ordered by name.
    async fn list_templates(&self) -> DomainResult<Vec<WorkflowTemplate>>;
}
