use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    LegacyAuthoringRecord, LegacyAvailability, SongId, SongProgress, SongRef, UserId, UserWorkflow, WorkflowStep,
    WorkflowTemplate,
};
use crate::domain::ports::{LegacyAuthoringSource, ProgressRepository, SongRepository, WorkflowRepository};

/// In-memory workflow store.
#[derive(Debug, Default)]
pub struct InMemoryWorkflowRepository {
    workflows: tokio::sync::RwLock<HashMap<UserId, UserWorkflow>>,
    templates: tokio::sync::RwLock<Vec<WorkflowTemplate>>,
    next_id: AtomicUsize,
    batch_reads: AtomicUsize,
}

impl InMemoryWorkflowRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `steps` as the user's workflow, replacing any previous one.
    pub async fn put_steps(&self, user_id: UserId, steps: Vec<WorkflowStep>) {
        let now = Utc::now();
        let workflow = UserWorkflow {
            id: Some(self.next_id.fetch_add(1, Ordering::SeqCst) as i64 + 1),
            user_id,
            name: "custom".to_string(),
            template_id: None,
            steps,
            created_at: now,
            updated_at: now,
        };
        self.workflows.write().await.insert(user_id, workflow);
    }

    pub async fn add_template(&self, template: WorkflowTemplate) {
        self.templates.write().await.push(template);
    }

    /// Number of `steps_for_users` calls served.
    pub fn batch_reads(&self) -> usize {
        self.batch_reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkflowRepository for InMemoryWorkflowRepository {
    async fn steps_for_users(&self, user_ids: &[UserId]) -> DomainResult<HashMap<UserId, Vec<WorkflowStep>>> {
        self.batch_reads.fetch_add(1, Ordering::SeqCst);
        let workflows = self.workflows.read().await;
        Ok(user_ids
            .iter()
            .filter_map(|id| workflows.get(id).map(|w| (*id, w.steps.clone())))
            .collect())
    }

    async fn get_for_user(&self, user_id: UserId) -> DomainResult<Option<UserWorkflow>> {
        Ok(self.workflows.read().await.get(&user_id).cloned())
    }

    async fn save(&self, workflow: &UserWorkflow) -> DomainResult<UserWorkflow> {
        workflow.validate()?;
        let mut workflows = self.workflows.write().await;
        let mut stored = workflow.clone();
        stored.id = match workflows.get(&workflow.user_id) {
            Some(existing) => existing.id,
            None => Some(self.next_id.fetch_add(1, Ordering::SeqCst) as i64 + 1),
        };
        workflows.insert(workflow.user_id, stored.clone());
        Ok(stored)
    }

    async fn get_template_by_name(&self, name: &str) -> DomainResult<Option<WorkflowTemplate>> {
        Ok(self.templates.read().await.iter().find(|t| t.name == name).cloned())
    }

    async fn get_default_template(&self) -> DomainResult<Option<WorkflowTemplate>> {
        Ok(self.templates.read().await.iter().find(|t| t.is_default).cloned())
    }

    async fn list_templates(&self) -> DomainResult<Vec<WorkflowTemplate>> {
        let mut templates = self.templates.read().await.clone();
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(templates)
    }
}

/// In-memory progress store keyed on `(song_id, step_name)`.
#[derive(Debug, Default)]
pub struct InMemoryProgressRepository {
    rows: tokio::sync::RwLock<BTreeMap<(SongId, String), SongProgress>>,
    batch_reads: AtomicUsize,
    writes: AtomicUsize,
}

impl InMemoryProgressRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `rows_for_songs` calls served.
    pub fn batch_reads(&self) -> usize {
        self.batch_reads.load(Ordering::SeqCst)
    }

    /// Total rows written through `upsert`.
    pub fn rows_written(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryProgressRepository {
    async fn rows_for_songs(&self, song_ids: &[SongId]) -> DomainResult<Vec<SongProgress>> {
        self.batch_reads.fetch_add(1, Ordering::SeqCst);
        let rows = self.rows.read().await;
        Ok(rows
            .values()
            .filter(|row| song_ids.contains(&row.song_id))
            .cloned()
            .collect())
    }

    async fn get(&self, song_id: SongId, step_name: &str) -> DomainResult<Option<SongProgress>> {
        Ok(self.rows.read().await.get(&(song_id, step_name.to_string())).cloned())
    }

    async fn upsert(&self, rows: &[SongProgress]) -> DomainResult<u64> {
        let mut stored = self.rows.write().await;
        for row in rows {
            stored.insert((row.song_id, row.step_name.clone()), row.clone());
        }
        self.writes.fetch_add(rows.len(), Ordering::SeqCst);
        Ok(rows.len() as u64)
    }
}

/// In-memory legacy authoring source.
///
/// `fail_reads` makes every read return a database error, standing in for a
/// legacy store that breaks after startup.
#[derive(Debug)]
pub struct InMemoryLegacyAuthoringSource {
    availability: LegacyAvailability,
    records: tokio::sync::RwLock<BTreeMap<SongId, LegacyAuthoringRecord>>,
    fail_reads: AtomicBool,
    batch_reads: AtomicUsize,
}

impl InMemoryLegacyAuthoringSource {
    pub fn new(availability: LegacyAvailability) -> Self {
        Self {
            availability,
            records: tokio::sync::RwLock::new(BTreeMap::new()),
            fail_reads: AtomicBool::new(false),
            batch_reads: AtomicUsize::new(0),
        }
    }

    pub async fn put(&self, record: LegacyAuthoringRecord) {
        self.records.write().await.insert(record.song_id, record);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Number of `records_for_songs` calls served.
    pub fn batch_reads(&self) -> usize {
        self.batch_reads.load(Ordering::SeqCst)
    }

    fn check_readable(&self) -> DomainResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(DomainError::DatabaseError("no such table: authoring".to_string()));
        }
        Ok(())
    }
}

impl Default for InMemoryLegacyAuthoringSource {
    fn default() -> Self {
        Self::new(LegacyAvailability::Available)
    }
}

#[async_trait]
impl LegacyAuthoringSource for InMemoryLegacyAuthoringSource {
    fn availability(&self) -> LegacyAvailability {
        self.availability
    }

    async fn records_for_songs(&self, song_ids: &[SongId]) -> DomainResult<Vec<LegacyAuthoringRecord>> {
        self.batch_reads.fetch_add(1, Ordering::SeqCst);
        if !self.availability.is_available() {
            return Ok(Vec::new());
        }
        self.check_readable()?;
        let records = self.records.read().await;
        Ok(song_ids.iter().filter_map(|id| records.get(id).copied()).collect())
    }

    async fn records_after(&self, after_song_id: SongId, limit: usize) -> DomainResult<Vec<LegacyAuthoringRecord>> {
        if !self.availability.is_available() {
            return Ok(Vec::new());
        }
        self.check_readable()?;
        let records = self.records.read().await;
        Ok(records
            .range((Bound::Excluded(after_song_id), Bound::Unbounded))
            .take(limit)
            .map(|(_, record)| *record)
            .collect())
    }
}

/// In-memory song ownership table.
#[derive(Debug, Default)]
pub struct InMemorySongRepository {
    owners: tokio::sync::RwLock<BTreeMap<SongId, UserId>>,
}

impl InMemorySongRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, song: SongRef) {
        self.owners.write().await.insert(song.id, song.owner_user_id);
    }
}

#[async_trait]
impl SongRepository for InMemorySongRepository {
    async fn owners_for_songs(&self, song_ids: &[SongId]) -> DomainResult<HashMap<SongId, UserId>> {
        let owners = self.owners.read().await;
        Ok(song_ids
            .iter()
            .filter_map(|id| owners.get(id).map(|owner| (*id, *owner)))
            .collect())
    }

    async fn songs_for_user(&self, user_id: UserId) -> DomainResult<Vec<SongRef>> {
        Ok(self
            .owners
            .read()
            .await
            .iter()
            .filter(|(_, owner)| **owner == user_id)
            .map(|(id, owner)| SongRef::new(*id, *owner))
            .collect())
    }
}
