//! Workflow domain model.
//!
//! A workflow is the ordered list of production steps a user tracks for each
//! of their songs. Templates are read-only prototypes that new users clone at
//! onboarding; each user owns at most one active workflow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::UserId;

/// Maximum accepted length of a step identifier.
const MAX_STEP_NAME_LEN: usize = 64;

/// A single named step within a workflow or template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Identifier used as the progress key (e.g. "tempo_map").
    pub step_name: String,
    /// Human-readable label (e.g. "Tempo Map").
    pub display_name: String,
    /// Display position. Never used for completion math.
    pub order_index: i64,
}

impl WorkflowStep {
    pub fn new(step_name: impl Into<String>, display_name: impl Into<String>, order_index: i64) -> Self {
        Self {
            step_name: step_name.into(),
            display_name: display_name.into(),
            order_index,
        }
    }
}

/// Caller-supplied step when customizing a workflow. Position in the list
/// becomes the `order_index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSpec {
    pub step_name: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl StepSpec {
    pub fn named(step_name: impl Into<String>) -> Self {
        Self {
            step_name: step_name.into(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }
}

/// Read-only prototype workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowTemplate {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_default: bool,
    /// Steps ordered by `order_index`.
    pub steps: Vec<WorkflowStep>,
}

/// A user's active workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserWorkflow {
    /// Row id; `None` until persisted.
    pub id: Option<i64>,
    pub user_id: UserId,
    pub name: String,
    /// Template this workflow was cloned from, if any.
    pub template_id: Option<i64>,
    /// Steps ordered by `order_index`.
    pub steps: Vec<WorkflowStep>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserWorkflow {
    /// Clone a template into a fresh, unsaved workflow for `user_id`.
    pub fn from_template(user_id: UserId, template: &WorkflowTemplate) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            user_id,
            name: template.name.clone(),
            template_id: Some(template.id),
            steps: template.steps.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Build a custom workflow from step specs.
    pub fn custom(user_id: UserId, name: impl Into<String>, specs: Vec<StepSpec>) -> DomainResult<Self> {
        let now = Utc::now();
        let mut workflow = Self {
            id: None,
            user_id,
            name: name.into(),
            template_id: None,
            steps: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        workflow.replace_steps(specs)?;
        Ok(workflow)
    }

    /// Replace the whole step list. Order of `specs` becomes `order_index`.
    pub fn replace_steps(&mut self, specs: Vec<StepSpec>) -> DomainResult<()> {
        let steps = build_steps(specs)?;
        self.steps = steps;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Step identifiers in display order.
    pub fn step_names(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.step_name.clone()).collect()
    }

    /// Check the uniqueness invariants on step names and order indices.
    pub fn validate(&self) -> DomainResult<()> {
        validate_steps(&self.steps)
    }
}

/// Sort steps by `order_index` in place.
pub fn sort_steps(steps: &mut [WorkflowStep]) {
    steps.sort_by_key(|s| s.order_index);
}

fn build_steps(specs: Vec<StepSpec>) -> DomainResult<Vec<WorkflowStep>> {
    let steps: Vec<WorkflowStep> = specs
        .into_iter()
        .enumerate()
        .map(|(index, spec)| {
            let display_name = spec
                .display_name
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| humanize_step_name(&spec.step_name));
            WorkflowStep::new(spec.step_name, display_name, index as i64)
        })
        .collect();

    validate_steps(&steps)?;
    Ok(steps)
}

/// Validate step identifiers plus uniqueness of names and order indices.
pub fn validate_steps(steps: &[WorkflowStep]) -> DomainResult<()> {
    let mut names = HashSet::with_capacity(steps.len());
    let mut orders = HashSet::with_capacity(steps.len());

    for step in steps {
        validate_step_name(&step.step_name)?;
        if !names.insert(step.step_name.as_str()) {
            return Err(DomainError::ValidationFailed(format!(
                "Duplicate step name in workflow: {}",
                step.step_name
            )));
        }
        if !orders.insert(step.order_index) {
            return Err(DomainError::ValidationFailed(format!(
                "Duplicate order_index in workflow: {}",
                step.order_index
            )));
        }
    }

    Ok(())
}

/// A step identifier is non-empty lowercase ASCII letters, digits, `_` or `-`.
pub fn validate_step_name(step_name: &str) -> DomainResult<()> {
    if step_name.is_empty() {
        return Err(DomainError::ValidationFailed(
            "Step name cannot be empty".to_string(),
        ));
    }
    if step_name.len() > MAX_STEP_NAME_LEN {
        return Err(DomainError::ValidationFailed(format!(
            "Step name exceeds {MAX_STEP_NAME_LEN} characters: {step_name}"
        )));
    }
    let valid = step_name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
    if !valid {
        return Err(DomainError::ValidationFailed(format!(
            "Invalid step name '{step_name}': use lowercase letters, digits, '_' or '-'"
        )));
    }
    Ok(())
}

/// Derive a display name from a step identifier.
///
/// `_` and `-` become spaces; every word gets an uppercase first letter and
/// lowercase remainder: `tempo_map` -> `Tempo Map`.
pub fn humanize_step_name(step_name: &str) -> String {
    step_name
        .split(['_', '-', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
