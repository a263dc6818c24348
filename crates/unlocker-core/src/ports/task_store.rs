//! TaskStore port - タスク文書と link ごとの結果レコードの正本
//!
//! コアが依存するストア機能はこれだけ:
//! - get-task-by-id
//! - update-task-fields
//! - upsert-sub-record-by-key
//! - atomic-increment-field
//! - list-sub-records-for-task
//! - "not found"（`StoreError::NotFound`）
//!
//! `defer_result` は upsert の条件付き版（確定済みレコードを Deferred で上書きしない）。
//! `delete_task` はタスク削除の経路でのみ使う。

use async_trait::async_trait;

use crate::domain::{Counter, ResultRecord, StoreError, TaskId, TaskPatch, TaskRecord};

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn get_task(&self, task_id: &TaskId) -> Result<TaskRecord, StoreError>;

    async fn update_task(&self, task_id: &TaskId, patch: TaskPatch) -> Result<(), StoreError>;

    /// Insert or replace the result record keyed by `(task_id, record.lid)`.
    ///
    /// Returns the record that was replaced, if any. The read of the previous
    /// value and the write are a single atomic step.
    async fn upsert_result(
        &self,
        task_id: &TaskId,
        record: ResultRecord,
    ) -> Result<Option<ResultRecord>, StoreError>;

    /// Write a deferred record unless the key already holds a counted one
    /// (Done / Error). Returns whether the record was written. The check and
    /// the write are a single atomic step.
    async fn defer_result(
        &self,
        task_id: &TaskId,
        record: ResultRecord,
    ) -> Result<bool, StoreError>;

    /// Atomic `field += by`. Returns the new value.
    async fn increment(
        &self,
        task_id: &TaskId,
        counter: Counter,
        by: u64,
    ) -> Result<u64, StoreError>;

    async fn list_results(&self, task_id: &TaskId) -> Result<Vec<ResultRecord>, StoreError>;

    /// Remove the task and its result records. Returns `false` when it did
    /// not exist.
    async fn delete_task(&self, task_id: &TaskId) -> Result<bool, StoreError>;
}
