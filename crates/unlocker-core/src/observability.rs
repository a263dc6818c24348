//! Run summary counts.

use serde::{Deserialize, Serialize};

use crate::domain::{LinkId, LinkOutcome, LinkStatus};

/// What the batch entry point reports back.
///
/// `errors` counts links that ended in error; deferred links are reported
/// separately and count as neither.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveSummary {
    pub processed: usize,
    pub done: usize,
    pub errors: usize,
    pub deferred: usize,
    pub direct_count: usize,
    pub timer_count: usize,
}

impl SolveSummary {
    pub fn tally<'a, I>(outcomes: I, deferred: usize, direct_count: usize, timer_count: usize) -> Self
    where
        I: IntoIterator<Item = &'a (LinkId, LinkOutcome)>,
    {
        let mut summary = Self {
            processed: direct_count + timer_count,
            deferred,
            direct_count,
            timer_count,
            ..Self::default()
        };
        for (_, outcome) in outcomes {
            match outcome.status {
                LinkStatus::Done => summary.done += 1,
                LinkStatus::Deferred => {}
                _ => summary.errors += 1,
            }
        }
        summary
    }
}
