//! Errors - エラー型と分類

use thiserror::Error;

use super::ids::TaskId;

/// Failure of one link or one invocation.
///
/// Stage failures and timeouts are converted into a `LinkOutcome` by the
/// chain/supervisor and never escape a single link. Only `TaskNotFound` and
/// `InvalidRequest` are surfaced to callers of the entry points.
#[derive(Debug, Error)]
pub enum UnlockError {
    #[error("No solver matched for this URL")]
    Unmatched,

    /// A resolver answered, but with a failure.
    #[error("{0}")]
    Remote(String),

    #[error("Timed out after {0}s")]
    TimedOut(u64),

    /// A resolver call blew up before producing an answer.
    #[error("resolver error: {0}")]
    Resolver(String),

    #[error("http: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("{0}")]
    InvalidRequest(String),
}

/// Task store failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("task not found: {0}")]
    NotFound(TaskId),

    #[error("store backend: {0}")]
    Backend(String),
}

/// Event delivery failure. Always swallowed by the pipeline.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EventSinkError {
    #[error("event consumer is gone")]
    Closed,
}
