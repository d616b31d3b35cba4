//! Workflow CLI commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::cli::context::AppContext;
use crate::cli::output::{output, table_with_header, truncate, CommandOutput};
use crate::domain::models::{StepSpec, UserId, UserWorkflow, WorkflowStep, WorkflowTemplate};

#[derive(Subcommand, Debug)]
pub enum WorkflowCommands {
    /// Show a user's workflow
    Show(ShowArgs),
    /// Give a user a workflow cloned from a template
    Init(InitArgs),
    /// Replace a user's steps, in order
    Set(SetArgs),
    /// List workflow templates
    Templates,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    pub user_id: UserId,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    pub user_id: UserId,

    /// Template name (defaults to the default template)
    #[arg(long, short)]
    pub template: Option<String>,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    pub user_id: UserId,

    /// Steps as `step_name` or `step_name=Display Name`
    #[arg(required = true, num_args = 1..)]
    pub steps: Vec<String>,
}

/// Parse `step_name` or `step_name=Display Name`.
pub fn parse_step_spec(raw: &str) -> StepSpec {
    match raw.split_once('=') {
        Some((name, display)) if !display.trim().is_empty() => {
            StepSpec::named(name.trim()).with_display_name(display.trim())
        }
        Some((name, _)) => StepSpec::named(name.trim()),
        None => StepSpec::named(raw.trim()),
    }
}

#[derive(Debug, Serialize)]
pub struct WorkflowOutput {
    pub user_id: UserId,
    pub workflow: Option<UserWorkflow>,
}

impl CommandOutput for WorkflowOutput {
    fn to_human(&self) -> String {
        let Some(workflow) = &self.workflow else {
            return format!("User {} has no workflow; the default steps apply", self.user_id);
        };

        format!(
            "Workflow '{}' for user {} ({} steps)\n{}",
            workflow.name,
            workflow.user_id,
            workflow.steps.len(),
            steps_table(&workflow.steps)
        )
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
pub struct TemplatesOutput {
    pub templates: Vec<WorkflowTemplate>,
}

impl CommandOutput for TemplatesOutput {
    fn to_human(&self) -> String {
        if self.templates.is_empty() {
            return "No workflow templates found.".to_string();
        }

        let mut table = table_with_header(&["Name", "Default", "Steps", "Description"]);
        for template in &self.templates {
            table.add_row(vec![
                template.name.clone(),
                if template.is_default { "yes" } else { "" }.to_string(),
                template.steps.len().to_string(),
                truncate(&template.description, 50),
            ]);
        }
        table.to_string()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

fn steps_table(steps: &[WorkflowStep]) -> String {
    let mut table = table_with_header(&["#", "Step", "Display name"]);
    for step in steps {
        table.add_row(vec![
            step.order_index.to_string(),
            step.step_name.clone(),
            step.display_name.clone(),
        ]);
    }
    table.to_string()
}

pub async fn execute(command: WorkflowCommands, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let service = ctx.workflow_service();

    match command {
        WorkflowCommands::Show(args) => {
            let workflow = service
                .get(args.user_id)
                .await
                .with_context(|| format!("Failed to load workflow for user {}", args.user_id))?;
            output(
                &WorkflowOutput {
                    user_id: args.user_id,
                    workflow,
                },
                json_mode,
            );
        }
        WorkflowCommands::Init(args) => {
            let workflow = service
                .ensure_user_workflow(args.user_id, args.template.as_deref())
                .await
                .with_context(|| format!("Failed to create workflow for user {}", args.user_id))?;
            output(
                &WorkflowOutput {
                    user_id: args.user_id,
                    workflow: Some(workflow),
                },
                json_mode,
            );
        }
        WorkflowCommands::Set(args) => {
            let specs = args.steps.iter().map(|raw| parse_step_spec(raw)).collect();
            let workflow = service
                .customize(args.user_id, specs)
                .await
                .with_context(|| format!("Failed to update workflow for user {}", args.user_id))?;
            output(
                &WorkflowOutput {
                    user_id: args.user_id,
                    workflow: Some(workflow),
                },
                json_mode,
            );
        }
        WorkflowCommands::Templates => {
            let templates = service.list_templates().await.context("Failed to list templates")?;
            output(&TemplatesOutput { templates }, json_mode);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_step_spec() {
        let plain = parse_step_spec("drums");
        assert_eq!(plain.step_name, "drums");
        assert_eq!(plain.display_name, None);

        let named = parse_step_spec("pro_keys=Pro Keys");
        assert_eq!(named.step_name, "pro_keys");
        assert_eq!(named.display_name.as_deref(), Some("Pro Keys"));

        let blank = parse_step_spec("bass=");
        assert_eq!(blank.step_name, "bass");
        assert_eq!(blank.display_name, None);
    }

    #[test]
    fn test_missing_workflow_message() {
        let out = WorkflowOutput {
            user_id: 4,
            workflow: None,
        };
        assert!(out.to_human().contains("no workflow"));
        assert!(out.to_json()["workflow"].is_null());
    }
}
