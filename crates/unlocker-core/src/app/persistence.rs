//! Persistence adapter - 結果の保存・完了カウンタ・完了判定
//!
//! # 手順（1 リンクごと）
//! 1. 結果レコードを upsert（`(task_id, lid)` で冪等）。
//!    Deferred は確定済み（Done / Error）のレコードを上書きしない
//! 2. Deferred 以外なら `completedLinksCount` を原子的に +1
//!    （同じ lid がすでにカウント済みなら加算しない）
//! 3. タスクを再読込し、`count >= total && total > 0` なら結果を走査して
//!    completed / failed を確定する
//!
//! 3 は境界付近で並行に複数回走りうるが、同じ入力から同じ値を書くので無害。
//! `completedAt` は結果レコードの `solvedAt` の最大値を使うため、並行した
//! 確定処理が異なる時刻を書くことはない。

use std::sync::Arc;

use crate::domain::{
    Counter, LinkInput, LinkOutcome, ResultRecord, StoreError, TaskId, TaskPatch, TaskStatus,
};
use crate::ports::{Clock, TaskStore};

pub struct PersistenceAdapter {
    store: Arc<dyn TaskStore>,
    clock: Arc<dyn Clock>,
}

impl PersistenceAdapter {
    pub fn new(store: Arc<dyn TaskStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Write one terminal result. Returns the final task status when this
    /// call finalized the task.
    pub async fn write_result(
        &self,
        task_id: &TaskId,
        link: &LinkInput,
        outcome: &LinkOutcome,
        extracted_by: &str,
    ) -> Result<Option<TaskStatus>, StoreError> {
        let record = ResultRecord::from_outcome(
            link.id.clone(),
            link.link.clone(),
            outcome,
            extracted_by,
            self.clock.now(),
        );
        if !outcome.status.is_counted() {
            if !self.store.defer_result(task_id, record).await? {
                tracing::debug!(task_id = %task_id, lid = %link.id, "settled result kept, deferral dropped");
            }
            return Ok(None);
        }

        let previous = self.store.upsert_result(task_id, record).await?;

        let already_counted = previous.is_some_and(|p| p.status.is_counted());
        if already_counted {
            tracing::debug!(task_id = %task_id, lid = %link.id, "result rewritten, counter untouched");
        } else {
            let count = self
                .store
                .increment(task_id, Counter::CompletedLinks, 1)
                .await?;
            tracing::debug!(task_id = %task_id, lid = %link.id, count, "completed links incremented");
        }

        self.finalize_if_complete(task_id).await
    }

    /// Like `write_result`, but failures are logged and swallowed so one
    /// link's store trouble never reaches its siblings.
    pub async fn persist(
        &self,
        task_id: &TaskId,
        link: &LinkInput,
        outcome: &LinkOutcome,
        extracted_by: &str,
    ) -> Option<TaskStatus> {
        match self
            .write_result(task_id, link, outcome, extracted_by)
            .await
        {
            Ok(finalized) => finalized,
            Err(e) => {
                tracing::warn!(task_id = %task_id, lid = %link.id, error = %e, "failed to persist link result");
                None
            }
        }
    }

    /// Completion consensus. One success-class record is enough for
    /// `completed`; otherwise `failed`.
    pub async fn finalize_if_complete(
        &self,
        task_id: &TaskId,
    ) -> Result<Option<TaskStatus>, StoreError> {
        let task = self.store.get_task(task_id).await?;
        let total = task.total_links();
        if total == 0 || task.completed_links_count < total {
            return Ok(None);
        }

        let results = self.store.list_results(task_id).await?;
        let any_success = results.iter().any(|r| r.status.is_success());
        let completed_at = results
            .iter()
            .map(|r| r.solved_at)
            .max()
            .unwrap_or_else(|| self.clock.now());
        let status = TaskStatus::from_consensus(any_success);

        self.store
            .update_task(task_id, TaskPatch::finalized(status, completed_at))
            .await?;
        tracing::info!(
            task_id = %task_id,
            status = ?status,
            completed = task.completed_links_count,
            total,
            "task finalized"
        );
        Ok(Some(status))
    }
}
