//! In-memory task store.
//!
//! Single lock over the whole state, so every trait method is atomic on its
//! own. `upsert_result` and `defer_result` read the existing record and write
//! the new one under the same guard.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::domain::{Counter, LinkId, ResultRecord, StoreError, TaskId, TaskPatch, TaskRecord};
use crate::ports::TaskStore;

#[derive(Default)]
struct InMemoryStoreState {
    tasks: HashMap<TaskId, TaskRecord>,
    /// task -> record key -> record
    results: HashMap<TaskId, BTreeMap<String, ResultRecord>>,
}

/// Serializable dump of the store (CLI `--state` file).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub tasks: Vec<StoredTask>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTask {
    pub task: TaskRecord,
    #[serde(default)]
    pub results: Vec<ResultRecord>,
}

#[derive(Clone, Default)]
pub struct InMemoryTaskStore {
    state: Arc<Mutex<InMemoryStoreState>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let mut state = InMemoryStoreState::default();
        for stored in snapshot.tasks {
            let results = stored
                .results
                .into_iter()
                .map(|r| (r.key(), r))
                .collect();
            state.results.insert(stored.task.id.clone(), results);
            state.tasks.insert(stored.task.id.clone(), stored.task);
        }
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Tasks come out sorted by id so the dump is stable.
    pub async fn snapshot(&self) -> StoreSnapshot {
        let state = self.state.lock().await;
        let mut tasks: Vec<StoredTask> = state
            .tasks
            .values()
            .map(|task| StoredTask {
                task: task.clone(),
                results: state
                    .results
                    .get(&task.id)
                    .map(|r| r.values().cloned().collect())
                    .unwrap_or_default(),
            })
            .collect();
        tasks.sort_by(|a, b| a.task.id.cmp(&b.task.id));
        StoreSnapshot { tasks }
    }

    /// Insert (or replace) a task document.
    pub async fn insert_task(&self, task: TaskRecord) {
        let mut state = self.state.lock().await;
        state.tasks.insert(task.id.clone(), task);
    }

    pub async fn result(&self, task_id: &TaskId, lid: &LinkId) -> Option<ResultRecord> {
        let state = self.state.lock().await;
        state
            .results
            .get(task_id)
            .and_then(|r| r.get(&lid.record_key()))
            .cloned()
    }
}

fn apply_patch(task: &mut TaskRecord, patch: TaskPatch) {
    if let Some(status) = patch.status {
        task.status = status;
    }
    if let Some(by) = patch.extracted_by {
        task.extracted_by = Some(by);
    }
    if let Some(at) = patch.processing_started_at {
        task.processing_started_at = Some(at);
    }
    if let Some(at) = patch.completed_at {
        task.completed_at = Some(at);
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn get_task(&self, task_id: &TaskId) -> Result<TaskRecord, StoreError> {
        let state = self.state.lock().await;
        state
            .tasks
            .get(task_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(task_id.clone()))
    }

    async fn update_task(&self, task_id: &TaskId, patch: TaskPatch) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let task = state
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| StoreError::NotFound(task_id.clone()))?;
        apply_patch(task, patch);
        Ok(())
    }

    async fn upsert_result(
        &self,
        task_id: &TaskId,
        record: ResultRecord,
    ) -> Result<Option<ResultRecord>, StoreError> {
        let mut state = self.state.lock().await;
        if !state.tasks.contains_key(task_id) {
            return Err(StoreError::NotFound(task_id.clone()));
        }
        let previous = state
            .results
            .entry(task_id.clone())
            .or_default()
            .insert(record.key(), record);
        Ok(previous)
    }

    async fn defer_result(
        &self,
        task_id: &TaskId,
        record: ResultRecord,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        if !state.tasks.contains_key(task_id) {
            return Err(StoreError::NotFound(task_id.clone()));
        }
        let results = state.results.entry(task_id.clone()).or_default();
        if results.get(&record.key()).is_some_and(|r| r.status.is_counted()) {
            return Ok(false);
        }
        results.insert(record.key(), record);
        Ok(true)
    }

    async fn increment(
        &self,
        task_id: &TaskId,
        counter: Counter,
        by: u64,
    ) -> Result<u64, StoreError> {
        let mut state = self.state.lock().await;
        let task = state
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| StoreError::NotFound(task_id.clone()))?;
        let field = match counter {
            Counter::CompletedLinks => &mut task.completed_links_count,
        };
        *field += by;
        Ok(*field)
    }

    async fn list_results(&self, task_id: &TaskId) -> Result<Vec<ResultRecord>, StoreError> {
        let state = self.state.lock().await;
        if !state.tasks.contains_key(task_id) {
            return Err(StoreError::NotFound(task_id.clone()));
        }
        Ok(state
            .results
            .get(task_id)
            .map(|r| r.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_task(&self, task_id: &TaskId) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        state.results.remove(task_id);
        Ok(state.tasks.remove(task_id).is_some())
    }
}
