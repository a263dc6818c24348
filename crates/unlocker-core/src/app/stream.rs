//! Streaming entry point - バッチと同じパイプラインで、進捗をイベントとして流す
//!
//! - 同じ link id のイベントは順序通り、異なる link id 間は交互に混ざりうる
//! - sink への送信失敗は握りつぶす（ストアへの保存は独立して完了する）
//! - task id があるときだけ保存・オーバーレイへの記録を行う

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::domain::{LinkInput, TaskId, UnlockError};
use crate::ports::EventSink;

use super::builder::App;
use super::overlay::OverlaySink;
use super::router::route;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamRequest {
    #[serde(default)]
    pub links: Vec<LinkInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_by: Option<String>,
}

impl StreamRequest {
    pub fn new(links: Vec<LinkInput>) -> Self {
        Self {
            links,
            task_id: None,
            extracted_by: None,
        }
    }

    pub fn for_task(mut self, task_id: impl Into<TaskId>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }
}

impl App {
    /// Resolve `req.links`, emitting events as they happen. Returns once every
    /// link has emitted its finished marker (or was skipped as not pending).
    pub async fn stream_solve(
        &self,
        req: StreamRequest,
        sink: Arc<dyn EventSink>,
    ) -> Result<(), UnlockError> {
        if req.links.is_empty() {
            return Err(UnlockError::InvalidRequest("No links provided".to_string()));
        }

        let sink: Arc<dyn EventSink> = match &req.task_id {
            Some(task_id) => Arc::new(OverlaySink::new(sink, self.overlay.clone(), task_id.clone())),
            None => sink,
        };
        let ctx = self
            .context(req.task_id.clone(), req.extracted_by.clone())
            .with_sink(sink);
        let span = tracing::info_span!(
            "stream_solve",
            run_id = %ctx.run_id,
            task_id = req.task_id.as_ref().map(|t| t.as_str()),
        );

        async {
            let routed = route(&req.links, &self.bypass);
            tracing::info!(
                direct = routed.direct.len(),
                timer = routed.timer.len(),
                "streaming links"
            );
            let (_, timer) = tokio::join!(
                self.direct.run(&routed.direct, &ctx),
                self.sequential.run(&routed.timer, &ctx),
            );
            if !timer.deferred.is_empty() {
                tracing::info!(deferred = timer.deferred.len(), "stream ended with deferred links");
            }
        }
        .instrument(span)
        .await;

        if let Some(task_id) = &req.task_id {
            self.overlay.mark_stream_ended(task_id).await;
        }
        Ok(())
    }
}
