//! Result overlay - ライブストリームで得た結果をストアの読み取りに重ねるキャッシュ
//!
//! - task id ごとに、ストリーム中に観測した link の状態を保持
//! - ストアの読み取り結果にマージして返す（read-through）
//! - 削除は明示的な `remove`、またはストリーム終了 + 猶予時間の経過後

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::domain::{
    EventSinkError, LinkId, LinkStatus, StreamEvent, TaskId, TaskRecord, TaskStatus,
};
use crate::ports::EventSink;

/// Locally observed state of one link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOverlay {
    pub status: LinkStatus,
    pub final_link: Option<String>,
    pub best_button_name: Option<String>,
}

#[derive(Debug, Default)]
struct OverlayEntry {
    links: HashMap<LinkId, LinkOverlay>,
    stream_ended_at: Option<Instant>,
}

pub struct ResultOverlay {
    grace: Duration,
    entries: Mutex<HashMap<TaskId, OverlayEntry>>,
}

fn is_settled(status: LinkStatus) -> bool {
    matches!(status, LinkStatus::Done | LinkStatus::Error)
}

fn evict(entries: &mut HashMap<TaskId, OverlayEntry>, grace: Duration) -> usize {
    let before = entries.len();
    entries.retain(|_, e| e.stream_ended_at.is_none_or(|at| at.elapsed() < grace));
    before - entries.len()
}

impl ResultOverlay {
    pub fn new(grace: Duration) -> Self {
        Self {
            grace,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Track a status event. Other event kinds are ignored.
    pub async fn record(&self, task_id: &TaskId, event: &StreamEvent) {
        let StreamEvent::Status {
            id,
            status,
            final_link,
            best_button_name,
        } = event
        else {
            return;
        };
        let mut entries = self.entries.lock().await;
        evict(&mut entries, self.grace);
        let entry = entries.entry(task_id.clone()).or_default();
        // a new stream for the same task is live again
        entry.stream_ended_at = None;
        entry.links.insert(
            id.clone(),
            LinkOverlay {
                status: *status,
                final_link: final_link.clone(),
                best_button_name: best_button_name.clone(),
            },
        );
    }

    /// Starts the grace window for `task_id`.
    pub async fn mark_stream_ended(&self, task_id: &TaskId) {
        let mut entries = self.entries.lock().await;
        evict(&mut entries, self.grace);
        if let Some(entry) = entries.get_mut(task_id) {
            entry.stream_ended_at = Some(Instant::now());
        }
    }

    pub async fn remove(&self, task_id: &TaskId) -> bool {
        self.entries.lock().await.remove(task_id).is_some()
    }

    /// Drops entries whose grace window has elapsed. Returns how many went.
    pub async fn evict_expired(&self) -> usize {
        let mut entries = self.entries.lock().await;
        evict(&mut entries, self.grace)
    }

    pub async fn get(&self, task_id: &TaskId, lid: &LinkId) -> Option<LinkOverlay> {
        self.evict_expired().await;
        let entries = self.entries.lock().await;
        entries.get(task_id).and_then(|e| e.links.get(lid)).cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Merge tracked state over a task read from the store.
    ///
    /// The overlay never moves a settled stored link back to an unsettled
    /// state. The task status is re-derived with the completion rule, but
    /// only while the stored task is not terminal.
    pub async fn merge(&self, mut task: TaskRecord) -> TaskRecord {
        self.evict_expired().await;
        let entries = self.entries.lock().await;
        let Some(entry) = entries.get(&task.id) else {
            return task;
        };

        for idx in 0..task.links.len() {
            let Some(lid) = task.link_id(idx) else {
                continue;
            };
            let Some(local) = entry.links.get(&lid) else {
                continue;
            };
            let link = &mut task.links[idx];
            let stored_settled = link.status.is_some_and(is_settled);
            if stored_settled && !is_settled(local.status) {
                continue;
            }
            link.status = Some(local.status);
            if local.final_link.is_some() {
                link.final_link = local.final_link.clone();
            }
            if local.best_button_name.is_some() {
                link.best_button_name = local.best_button_name.clone();
            }
        }

        if !task.status.is_terminal() && !task.links.is_empty() {
            let all_settled = task.links.iter().all(|l| l.status.is_some_and(is_settled));
            if all_settled {
                let any_success = task
                    .links
                    .iter()
                    .any(|l| l.status.is_some_and(LinkStatus::is_success));
                task.status = TaskStatus::from_consensus(any_success);
            }
        }
        task
    }
}

/// Sink wrapper that feeds status events into the overlay before forwarding.
pub struct OverlaySink {
    inner: Arc<dyn EventSink>,
    overlay: Arc<ResultOverlay>,
    task_id: TaskId,
}

impl OverlaySink {
    pub fn new(inner: Arc<dyn EventSink>, overlay: Arc<ResultOverlay>, task_id: TaskId) -> Self {
        Self {
            inner,
            overlay,
            task_id,
        }
    }
}

#[async_trait]
impl EventSink for OverlaySink {
    async fn emit(&self, event: StreamEvent) -> Result<(), EventSinkError> {
        self.overlay.record(&self.task_id, &event).await;
        self.inner.emit(event).await
    }
}
