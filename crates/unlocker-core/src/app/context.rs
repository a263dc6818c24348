//! Per-invocation context shared by both executors.

use std::sync::Arc;

use tokio::time::Instant;

use crate::domain::{RunId, TaskId};
use crate::ports::EventSink;

/// Default actor tag when the caller does not send one.
pub const DEFAULT_EXTRACTED_BY: &str = "Browser/Live";

#[derive(Clone)]
pub struct RunContext {
    pub run_id: RunId,
    /// Results are only persisted when a task id is known.
    pub task_id: Option<TaskId>,
    pub extracted_by: String,
    /// Invocation start. The sequential budget is measured from here.
    pub started_at: Instant,
    pub sink: Option<Arc<dyn EventSink>>,
}

impl RunContext {
    pub fn new(run_id: RunId, task_id: Option<TaskId>, extracted_by: Option<String>) -> Self {
        Self {
            run_id,
            task_id,
            extracted_by: extracted_by
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_EXTRACTED_BY.to_string()),
            started_at: Instant::now(),
            sink: None,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }
}
