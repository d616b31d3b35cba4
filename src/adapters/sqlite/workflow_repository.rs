//! SQLite implementation of the WorkflowRepository.

use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::HashMap;

use crate::adapters::sqlite::{distinct_ids, parse_datetime, ID_CHUNK_SIZE};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{UserId, UserWorkflow, WorkflowStep, WorkflowTemplate};
use crate::domain::ports::WorkflowRepository;

#[derive(Clone)]
pub struct SqliteWorkflowRepository {
    pool: SqlitePool,
}

impl SqliteWorkflowRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn steps_for_workflow(&self, workflow_id: i64) -> DomainResult<Vec<WorkflowStep>> {
        let rows: Vec<StepRow> = sqlx::query_as(
            "SELECT step_name, display_name, order_index FROM user_workflow_steps
             WHERE workflow_id = ? ORDER BY order_index",
        )
        .bind(workflow_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(StepRow::into_step).collect())
    }

    async fn template_steps(&self, template_ids: &[i64]) -> DomainResult<HashMap<i64, Vec<WorkflowStep>>> {
        let mut steps: HashMap<i64, Vec<WorkflowStep>> = HashMap::new();
        if template_ids.is_empty() {
            return Ok(steps);
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT template_id, step_name, display_name, order_index FROM workflow_template_steps WHERE template_id IN (",
        );
        let mut separated = builder.separated(", ");
        for id in template_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY template_id, order_index");

        let rows: Vec<TemplateStepRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        for row in rows {
            steps.entry(row.template_id).or_default().push(WorkflowStep {
                step_name: row.step_name,
                display_name: row.display_name,
                order_index: row.order_index,
            });
        }
        Ok(steps)
    }

    async fn attach_template_steps(&self, rows: Vec<TemplateRow>) -> DomainResult<Vec<WorkflowTemplate>> {
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let mut steps = self.template_steps(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| WorkflowTemplate {
                steps: steps.remove(&row.id).unwrap_or_default(),
                id: row.id,
                name: row.name,
                description: row.description,
                is_default: row.is_default,
            })
            .collect())
    }
}

#[async_trait]
impl WorkflowRepository for SqliteWorkflowRepository {
    // -- Workflow definitions --

    async fn steps_for_users(&self, user_ids: &[UserId]) -> DomainResult<HashMap<UserId, Vec<WorkflowStep>>> {
        let mut steps: HashMap<UserId, Vec<WorkflowStep>> = HashMap::new();

        for chunk in distinct_ids(user_ids).chunks(ID_CHUNK_SIZE) {
            // LEFT JOIN keeps users whose workflow has zero steps.
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
                "SELECT w.user_id, s.step_name, s.display_name, s.order_index
                 FROM user_workflows w
                 LEFT JOIN user_workflow_steps s ON s.workflow_id = w.id
                 WHERE w.user_id IN (",
            );
            let mut separated = builder.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
            separated.push_unseparated(") ORDER BY w.user_id, s.order_index");

            let rows: Vec<UserStepRow> = builder.build_query_as().fetch_all(&self.pool).await?;
            for row in rows {
                let entry = steps.entry(row.user_id).or_default();
                if let (Some(step_name), Some(order_index)) = (row.step_name, row.order_index) {
                    entry.push(WorkflowStep {
                        step_name,
                        display_name: row.display_name.unwrap_or_default(),
                        order_index,
                    });
                }
            }
        }

        Ok(steps)
    }

    async fn get_for_user(&self, user_id: UserId) -> DomainResult<Option<UserWorkflow>> {
        let row: Option<UserWorkflowRow> = sqlx::query_as(
            "SELECT id, user_id, name, template_id, created_at, updated_at FROM user_workflows WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let steps = self.steps_for_workflow(row.id).await?;
                Ok(Some(row.try_into_workflow(steps)?))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, workflow: &UserWorkflow) -> DomainResult<UserWorkflow> {
        workflow.validate()?;

        let mut tx = self.pool.begin().await?;

        let (workflow_id,): (i64,) = sqlx::query_as(
            r#"INSERT INTO user_workflows (user_id, name, template_id, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?)
               ON CONFLICT(user_id) DO UPDATE SET
                   name = excluded.name,
                   template_id = excluded.template_id,
                   updated_at = excluded.updated_at
               RETURNING id"#,
        )
        .bind(workflow.user_id)
        .bind(&workflow.name)
        .bind(workflow.template_id)
        .bind(workflow.created_at.to_rfc3339())
        .bind(workflow.updated_at.to_rfc3339())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM user_workflow_steps WHERE workflow_id = ?")
            .bind(workflow_id)
            .execute(&mut *tx)
            .await?;

        for step in &workflow.steps {
            sqlx::query(
                "INSERT INTO user_workflow_steps (workflow_id, step_name, display_name, order_index)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(workflow_id)
            .bind(&step.step_name)
            .bind(&step.display_name)
            .bind(step.order_index)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.get_for_user(workflow.user_id)
            .await?
            .ok_or(DomainError::WorkflowNotFound(workflow.user_id))
    }

    // -- Templates --

    async fn get_template_by_name(&self, name: &str) -> DomainResult<Option<WorkflowTemplate>> {
        let rows: Vec<TemplateRow> = sqlx::query_as(
            "SELECT id, name, description, is_default FROM workflow_templates WHERE name = ?",
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        Ok(self.attach_template_steps(rows).await?.into_iter().next())
    }

    async fn get_default_template(&self) -> DomainResult<Option<WorkflowTemplate>> {
        let rows: Vec<TemplateRow> = sqlx::query_as(
            "SELECT id, name, description, is_default FROM workflow_templates
             WHERE is_default = 1 ORDER BY id LIMIT 1",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(self.attach_template_steps(rows).await?.into_iter().next())
    }

    async fn list_templates(&self) -> DomainResult<Vec<WorkflowTemplate>> {
        let rows: Vec<TemplateRow> = sqlx::query_as(
            "SELECT id, name, description, is_default FROM workflow_templates ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        self.attach_template_steps(rows).await
    }
}

// ============================================================================
// Row types for sqlx
// ============================================================================

#[derive(sqlx::FromRow)]
struct UserWorkflowRow {
    id: i64,
    user_id: i64,
    name: String,
    template_id: Option<i64>,
    created_at: String,
    updated_at: String,
}

impl UserWorkflowRow {
    fn try_into_workflow(self, steps: Vec<WorkflowStep>) -> DomainResult<UserWorkflow> {
        Ok(UserWorkflow {
            id: Some(self.id),
            user_id: self.user_id,
            name: self.name,
            template_id: self.template_id,
            steps,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct StepRow {
    step_name: String,
    display_name: String,
    order_index: i64,
}

impl StepRow {
    fn into_step(self) -> WorkflowStep {
        WorkflowStep {
            step_name: self.step_name,
            display_name: self.display_name,
            order_index: self.order_index,
        }
    }
}

#[derive(sqlx::FromRow)]
struct UserStepRow {
    user_id: i64,
    step_name: Option<String>,
    display_name: Option<String>,
    order_index: Option<i64>,
}

#[derive(sqlx::FromRow)]
struct TemplateRow {
    id: i64,
    name: String,
    description: String,
    is_default: bool,
}

#[derive(sqlx::FromRow)]
struct TemplateStepRow {
    template_id: i64,
    step_name: String,
    display_name: String,
    order_index: i64,
}
