//! Retry supervisor - タイムアウト付きでチェーンを実行し、失敗時に 1 回だけ再試行
//!
//! - 各試行は `tokio::time::timeout` で打ち切る（future は drop される）
//! - 再試行は常に元の URL から始める
//! - 最終結果だけを 1 回保存する

use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;

use crate::domain::{LinkInput, LinkOutcome, LogLevel, UnlockError};
use crate::ports::IdGenerator;
use crate::resolver::{LinkJournal, ResolverChain};

use super::context::RunContext;
use super::persistence::PersistenceAdapter;

/// First try plus one retry.
pub const MAX_ATTEMPTS: u32 = 2;

pub struct RetrySupervisor {
    chain: Arc<ResolverChain>,
    persistence: Arc<PersistenceAdapter>,
    ids: Arc<dyn IdGenerator>,
    link_timeout: Duration,
    max_attempts: u32,
}

impl RetrySupervisor {
    pub fn new(
        chain: Arc<ResolverChain>,
        persistence: Arc<PersistenceAdapter>,
        ids: Arc<dyn IdGenerator>,
        link_timeout: Duration,
        max_attempts: u32,
    ) -> Self {
        Self {
            chain,
            persistence,
            ids,
            link_timeout,
            max_attempts: max_attempts.clamp(1, MAX_ATTEMPTS),
        }
    }

    /// Resolve one link to its terminal outcome, persist it, and close the
    /// link's event stream.
    pub async fn run(&self, link: &LinkInput, ctx: &RunContext) -> LinkOutcome {
        let span = tracing::info_span!(
            "link",
            run_id = %ctx.run_id,
            task_id = ctx.task_id.as_ref().map(|t| t.as_str()),
            lid = %link.id,
        );
        self.run_inner(link, ctx).instrument(span).await
    }

    async fn run_inner(&self, link: &LinkInput, ctx: &RunContext) -> LinkOutcome {
        let mut journal = LinkJournal::new(link.id.clone(), ctx.sink.clone());
        let mut attempt = 1;

        let outcome = loop {
            let outcome = self.attempt(&link.link, attempt, &mut journal).await;
            if outcome.is_success() || attempt >= self.max_attempts {
                break outcome;
            }
            attempt += 1;
            journal
                .log(
                    format!("Auto-retrying (attempt {attempt}/{})", self.max_attempts),
                    LogLevel::Warn,
                )
                .await;
        };

        let outcome = outcome.with_logs(journal.entries().to_vec());
        self.settle(link, &outcome, &journal, ctx).await;
        outcome
    }

    /// One timed chain run. Always starts from `url`.
    async fn attempt(&self, url: &str, attempt: u32, journal: &mut LinkJournal) -> LinkOutcome {
        let attempt_id = self.ids.generate_attempt_id();
        tracing::debug!(%attempt_id, attempt, "chain attempt started");

        match tokio::time::timeout(self.link_timeout, self.chain.run(url, journal)).await {
            Ok(outcome) => {
                tracing::debug!(%attempt_id, status = outcome.status.as_str(), "chain attempt finished");
                outcome
            }
            Err(_) => {
                let err = UnlockError::TimedOut(self.link_timeout.as_secs());
                tracing::warn!(%attempt_id, "chain attempt timed out");
                journal.error(err.to_string()).await;
                LinkOutcome::error(err.to_string())
            }
        }
    }

    /// Mark a link deferred without running it.
    pub async fn defer(&self, link: &LinkInput, reason: &str, ctx: &RunContext) -> LinkOutcome {
        let mut journal = LinkJournal::new(link.id.clone(), ctx.sink.clone());
        journal.log(reason, LogLevel::Warn).await;
        let outcome = LinkOutcome::deferred(journal.entries().to_vec());
        self.settle(link, &outcome, &journal, ctx).await;
        outcome
    }

    /// status event → store write → finished marker.
    async fn settle(
        &self,
        link: &LinkInput,
        outcome: &LinkOutcome,
        journal: &LinkJournal,
        ctx: &RunContext,
    ) {
        journal.status(outcome).await;
        if let Some(task_id) = &ctx.task_id {
            self.persistence
                .persist(task_id, link, outcome, &ctx.extracted_by)
                .await;
        }
        journal.finished().await;
    }
}
