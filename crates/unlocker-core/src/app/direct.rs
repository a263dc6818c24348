//! Direct executor - 全リンクを並行に実行し、全件の決着を待つ

use std::sync::Arc;

use futures::future::join_all;

use crate::domain::{LinkId, LinkInput, LinkOutcome};

use super::context::RunContext;
use super::supervisor::RetrySupervisor;

pub struct DirectExecutor {
    supervisor: Arc<RetrySupervisor>,
}

impl DirectExecutor {
    pub fn new(supervisor: Arc<RetrySupervisor>) -> Self {
        Self { supervisor }
    }

    /// No ordering among links. The supervisor never fails, so one link
    /// cannot cancel the others.
    pub async fn run(&self, links: &[LinkInput], ctx: &RunContext) -> Vec<(LinkId, LinkOutcome)> {
        if links.is_empty() {
            return Vec::new();
        }
        tracing::debug!(count = links.len(), "direct links started");
        join_all(links.iter().map(|link| async move {
            let outcome = self.supervisor.run(link, ctx).await;
            (link.id.clone(), outcome)
        }))
        .await
    }
}
