//! Sequential bypass executor - 1 件ずつ、呼び出し開始からの時間予算内で実行
//!
//! 各リンクの開始前に経過時間を確認し、予算を超えていれば停止する。
//! 未着手のリンクはまとめて（並行に）Deferred として保存し、次回の起動で
//! 再開できるようにする。

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use crate::domain::{LinkId, LinkInput, LinkOutcome};

use super::context::RunContext;
use super::supervisor::RetrySupervisor;

#[derive(Debug, Default)]
pub struct SequentialReport {
    /// Links that ran, in order.
    pub outcomes: Vec<(LinkId, LinkOutcome)>,
    /// Links that were never started.
    pub deferred: Vec<LinkId>,
}

pub struct SequentialExecutor {
    supervisor: Arc<RetrySupervisor>,
    budget: Duration,
}

impl SequentialExecutor {
    pub fn new(supervisor: Arc<RetrySupervisor>, budget: Duration) -> Self {
        Self { supervisor, budget }
    }

    pub async fn run(&self, links: &[LinkInput], ctx: &RunContext) -> SequentialReport {
        let mut report = SequentialReport::default();

        for (idx, link) in links.iter().enumerate() {
            let elapsed = ctx.started_at.elapsed();
            if elapsed > self.budget {
                let rest = &links[idx..];
                tracing::info!(
                    deferred = rest.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = self.budget.as_millis() as u64,
                    "time budget exceeded, deferring remaining links"
                );
                report.deferred = self.defer_all(rest, ctx).await;
                break;
            }
            let outcome = self.supervisor.run(link, ctx).await;
            report.outcomes.push((link.id.clone(), outcome));
        }

        report
    }

    /// One concurrent batch, not a loop of awaits.
    async fn defer_all(&self, links: &[LinkInput], ctx: &RunContext) -> Vec<LinkId> {
        let reason = format!(
            "Time budget exceeded ({}s), deferred to next run",
            self.budget.as_secs()
        );
        join_all(
            links
                .iter()
                .map(|link| self.supervisor.defer(link, &reason, ctx)),
        )
        .await;
        links.iter().map(|l| l.id.clone()).collect()
    }
}
