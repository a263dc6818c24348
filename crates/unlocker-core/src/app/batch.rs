//! Batch entry point - task id（と任意のリンク一覧）から集計だけを返す
//!
//! 1. タスクを取得（見つからなければ呼び出し全体がエラー）
//! 2. リンク一覧はリクエスト優先、なければ保存済みタスク。どちらにも
//!    保存済み結果レコードの status を反映する
//! 3. pending がなければ何もせず 0 件の集計を返す
//! 4. タスクを processing に更新し、direct / timer を並行に実行

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::domain::{
    LinkInput, LinkStatus, StoreError, TaskId, TaskPatch, TaskRecord, UnlockError,
};
use crate::observability::SolveSummary;

use super::builder::App;
use super::context::RunContext;
use super::router::route;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveTaskRequest {
    pub task_id: TaskId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<LinkInput>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_by: Option<String>,
}

impl SolveTaskRequest {
    pub fn new(task_id: impl Into<TaskId>) -> Self {
        Self {
            task_id: task_id.into(),
            links: None,
            extracted_by: None,
        }
    }

    pub fn with_links(mut self, links: Vec<LinkInput>) -> Self {
        self.links = Some(links);
        self
    }

    pub fn extracted_by(mut self, by: impl Into<String>) -> Self {
        self.extracted_by = Some(by.into());
        self
    }
}

impl App {
    pub async fn solve_task(&self, req: SolveTaskRequest) -> Result<SolveSummary, UnlockError> {
        let ctx = self.context(Some(req.task_id.clone()), req.extracted_by.clone());
        let span = tracing::info_span!("solve_task", run_id = %ctx.run_id, task_id = %req.task_id);
        self.solve_task_inner(req, ctx).instrument(span).await
    }

    async fn solve_task_inner(
        &self,
        req: SolveTaskRequest,
        ctx: RunContext,
    ) -> Result<SolveSummary, UnlockError> {
        let task = self.fetch_task(&req.task_id).await?;

        let links = match req.links {
            Some(links) if !links.is_empty() => {
                self.with_stored_status(&req.task_id, links).await?
            }
            _ => self.stored_links(task.clone()).await?,
        };

        let routed = route(&links, &self.bypass);
        if routed.is_empty() {
            tracing::info!("no pending links");
            return Ok(SolveSummary::default());
        }

        if task.status.is_terminal() {
            tracing::warn!(status = ?task.status, "task already finalized, status left untouched");
        } else {
            self.store
                .update_task(
                    &req.task_id,
                    TaskPatch::processing(ctx.extracted_by.clone(), self.clock.now()),
                )
                .await?;
        }

        tracing::info!(
            direct = routed.direct.len(),
            timer = routed.timer.len(),
            "resolving pending links"
        );
        let (direct, timer) = tokio::join!(
            self.direct.run(&routed.direct, &ctx),
            self.sequential.run(&routed.timer, &ctx),
        );

        let summary = SolveSummary::tally(
            direct.iter().chain(timer.outcomes.iter()),
            timer.deferred.len(),
            routed.direct.len(),
            routed.timer.len(),
        );
        tracing::info!(
            done = summary.done,
            errors = summary.errors,
            deferred = summary.deferred,
            "batch finished"
        );
        Ok(summary)
    }

    pub(crate) async fn fetch_task(&self, task_id: &TaskId) -> Result<TaskRecord, UnlockError> {
        match self.store.get_task(task_id).await {
            Ok(task) => Ok(task),
            Err(StoreError::NotFound(id)) => Err(UnlockError::TaskNotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Task links with stored result statuses applied, so a re-run skips
    /// what already settled and resumes what was deferred.
    async fn stored_links(&self, mut task: TaskRecord) -> Result<Vec<LinkInput>, UnlockError> {
        let results = self.store.list_results(&task.id).await?;
        task.apply_results(&results);
        Ok(task.link_inputs())
    }

    /// Explicit links take the status of their stored result record, so a
    /// caller-supplied list never re-runs (or defers) a settled link.
    async fn with_stored_status(
        &self,
        task_id: &TaskId,
        mut links: Vec<LinkInput>,
    ) -> Result<Vec<LinkInput>, UnlockError> {
        let stored: HashMap<String, LinkStatus> = self
            .store
            .list_results(task_id)
            .await?
            .into_iter()
            .map(|r| (r.key(), r.status))
            .collect();
        for link in &mut links {
            if let Some(status) = stored.get(&link.id.record_key()) {
                link.status = Some(*status);
            }
        }
        Ok(links)
    }

    /// Delete a task from the store and drop its live overlay entry.
    pub async fn remove_task(&self, task_id: &TaskId) -> Result<bool, UnlockError> {
        let removed = self.store.delete_task(task_id).await?;
        self.overlay.remove(task_id).await;
        tracing::info!(task_id = %task_id, removed, "task removed");
        Ok(removed)
    }

    /// Stored task with results and live overlay state merged in.
    pub async fn task_view(&self, task_id: &TaskId) -> Result<TaskRecord, UnlockError> {
        let mut task = self.fetch_task(task_id).await?;
        let results = self.store.list_results(task_id).await?;
        task.apply_results(&results);
        Ok(self.overlay.merge(task).await)
    }
}
