//! Resolver chain - 1 リンクをステージ表に沿って終端状態まで進める
//!
//! - ステージは固定順で評価され、現在のリンク（途中で書き換わる）に対して判定する
//! - リゾルバの失敗・例外はすべて `LinkOutcome::error` に変換される
//! - どのステージにもマッチしなければ `Unmatched`

use std::sync::Arc;

use crate::domain::{LinkOutcome, LogLevel, Selection, UnlockError};

use super::journal::LinkJournal;
use super::registry::{Capability, ResolverRegistry};
use super::stage::{BypassLoop, Stage, StageKind, StageTable};

/// Result of evaluating one stage.
enum Step {
    /// Stage did not apply.
    Skip,
    /// Continue with a rewritten link.
    Advance(String),
    Finish(LinkOutcome),
}

pub struct ResolverChain {
    table: StageTable,
    registry: Arc<ResolverRegistry>,
}

impl ResolverChain {
    pub fn new(table: StageTable, registry: Arc<ResolverRegistry>) -> Self {
        Self { table, registry }
    }

    /// Run one link through the table. Logs land in `journal`; the returned
    /// outcome carries none.
    pub async fn run(&self, url: &str, journal: &mut LinkJournal) -> LinkOutcome {
        let mut current = url.to_string();
        for stage in self.table.stages() {
            match self.step(stage, &current, journal).await {
                Step::Skip => {}
                Step::Advance(next) => current = next,
                Step::Finish(outcome) => return outcome,
            }
        }

        let err = UnlockError::Unmatched;
        journal.error(err.to_string()).await;
        LinkOutcome::error(err.to_string())
    }

    async fn step(&self, stage: &Stage, current: &str, journal: &mut LinkJournal) -> Step {
        if let StageKind::BypassLoop(lp) = &stage.kind {
            return self.bypass(stage, lp, current, journal).await;
        }
        if !stage.matcher.matches(current) {
            return Step::Skip;
        }
        tracing::debug!(stage = %stage.label, url = current, "stage matched");

        match &stage.kind {
            StageKind::Shortcut { capability } => {
                journal
                    .info(format!("{} detected, direct solve", stage.label))
                    .await;
                self.finish(stage, capability, current, journal).await
            }
            StageKind::Terminal { capability } => {
                journal.info(format!("{} solving...", stage.label)).await;
                self.finish(stage, capability, current, journal).await
            }
            StageKind::Rewrite { capability } => {
                journal.info(format!("{} solving...", stage.label)).await;
                match self.invoke(capability, current).await {
                    Ok((next, _)) => {
                        journal.intermediate(&next).await;
                        Step::Advance(next)
                    }
                    Err(msg) => {
                        journal
                            .error(format!("{} failed: {msg}", stage.label))
                            .await;
                        Step::Finish(LinkOutcome::error(msg))
                    }
                }
            }
            StageKind::PassThrough => {
                journal
                    .log(
                        format!("{} resolved: {current}", stage.label),
                        LogLevel::Success,
                    )
                    .await;
                Step::Finish(LinkOutcome::done(current))
            }
            StageKind::BypassLoop(_) => Step::Skip,
        }
    }

    /// Terminal-capable call: success ends the chain with the final link.
    async fn finish(
        &self,
        stage: &Stage,
        capability: &Capability,
        current: &str,
        journal: &mut LinkJournal,
    ) -> Step {
        match self.invoke(capability, current).await {
            Ok((final_link, selection)) => {
                journal
                    .log(
                        format!("{} done: {final_link}", stage.label),
                        LogLevel::Success,
                    )
                    .await;
                Step::Finish(LinkOutcome::done(final_link).with_selection(selection))
            }
            Err(msg) => {
                journal
                    .error(format!("{} failed: {msg}", stage.label))
                    .await;
                Step::Finish(LinkOutcome::error(msg))
            }
        }
    }

    /// Bounded loop. A failed iteration ends the loop, never the chain.
    ///
    /// Eligibility is only checked before the first iteration; once entered,
    /// the loop keeps chasing until a final-family link or the iteration cap.
    async fn bypass(
        &self,
        stage: &Stage,
        lp: &BypassLoop,
        url: &str,
        journal: &mut LinkJournal,
    ) -> Step {
        let mut current = url.to_string();
        let mut iteration = 0;

        while iteration < lp.max_iterations && !lp.final_family.matches(&current) {
            if iteration == 0 && !stage.matcher.matches(&current) {
                break;
            }
            let route = lp.route_for(&current);
            journal
                .info(format!("{} (loop {})", route.label, iteration + 1))
                .await;

            match self.invoke(&route.capability, &current).await {
                Ok((next, _)) => {
                    journal.intermediate(&next).await;
                    current = next;
                    iteration += 1;
                }
                Err(msg) => {
                    journal
                        .error(format!("{} failed: {msg}", route.label))
                        .await;
                    break;
                }
            }
        }

        if iteration == 0 {
            Step::Skip
        } else {
            Step::Advance(current)
        }
    }

    /// Call a resolver. `Ok` only when it succeeded with a link.
    async fn invoke(
        &self,
        capability: &Capability,
        url: &str,
    ) -> Result<(String, Selection), String> {
        let resolver = self
            .registry
            .get(capability)
            .ok_or_else(|| format!("no resolver registered for '{capability}'"))?;

        match resolver.resolve(url).await {
            Ok(outcome) => match outcome.resolved_url() {
                Some(next) => {
                    let next = next.to_string();
                    Ok((next, outcome.selection))
                }
                None => Err(outcome.message_or("resolver returned no link")),
            },
            Err(e) => {
                tracing::warn!(capability = %capability, error = %e, "resolver call failed");
                Err(e.to_string())
            }
        }
    }
}
