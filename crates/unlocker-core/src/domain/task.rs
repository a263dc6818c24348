//! Task document and per-link result record.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{LinkId, TaskId};
use super::link::{Link, LinkInput, LinkStatus};
use super::outcome::{LinkOutcome, LogEntry};

/// Task status.
///
/// Transitions are monotonic: Pending -> Processing -> {Completed, Failed}.
/// Resetting to Pending is an operator action outside the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Completion consensus: one success is enough.
    pub fn from_consensus(any_success: bool) -> Self {
        if any_success {
            TaskStatus::Completed
        } else {
            TaskStatus::Failed
        }
    }
}

/// Task document as held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: TaskId,

    #[serde(default)]
    pub links: Vec<Link>,

    pub status: TaskStatus,

    /// Only ever incremented, and only for non-deferred outcomes.
    #[serde(default)]
    pub completed_links_count: u64,

    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_started_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_by: Option<String>,
}

impl TaskRecord {
    pub fn new(id: impl Into<TaskId>, links: Vec<Link>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            links,
            status: TaskStatus::Pending,
            completed_links_count: 0,
            created_at,
            processing_started_at: None,
            completed_at: None,
            extracted_by: None,
        }
    }

    pub fn total_links(&self) -> u64 {
        self.links.len() as u64
    }

    /// Id of the link at `idx`. Links without an id get their index.
    pub fn link_id(&self, idx: usize) -> Option<LinkId> {
        self.links
            .get(idx)
            .map(|link| link.id.clone().unwrap_or(LinkId::Index(idx as u64)))
    }

    /// Links as entry-point inputs.
    pub fn link_inputs(&self) -> Vec<LinkInput> {
        self.links
            .iter()
            .enumerate()
            .map(|(idx, link)| LinkInput {
                id: link.id.clone().unwrap_or(LinkId::Index(idx as u64)),
                name: link.name.clone().unwrap_or_default(),
                link: link.link.clone(),
                status: link.status,
            })
            .collect()
    }

    /// Copy stored result records onto the matching links.
    pub fn apply_results(&mut self, results: &[ResultRecord]) {
        let by_key: HashMap<String, &ResultRecord> =
            results.iter().map(|r| (r.key(), r)).collect();
        for idx in 0..self.links.len() {
            let Some(key) = self.link_id(idx).map(|id| id.record_key()) else {
                continue;
            };
            let Some(record) = by_key.get(&key) else {
                continue;
            };
            let link = &mut self.links[idx];
            link.status = Some(record.status);
            link.final_link = record.final_link.clone();
            link.logs = record.logs.clone();
            link.best_button_name = record.best_button_name.clone();
            link.all_available_buttons = record.all_available_buttons.clone();
        }
    }
}

/// Partial update of a task document. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub status: Option<TaskStatus>,
    pub extracted_by: Option<String>,
    pub processing_started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskPatch {
    pub fn processing(extracted_by: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            status: Some(TaskStatus::Processing),
            extracted_by: Some(extracted_by.into()),
            processing_started_at: Some(at),
            completed_at: None,
        }
    }

    pub fn finalized(status: TaskStatus, at: DateTime<Utc>) -> Self {
        Self {
            status: Some(status),
            completed_at: Some(at),
            ..Self::default()
        }
    }
}

/// Counter fields that support atomic increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    CompletedLinks,
}

/// Per-link result sub-record, keyed by `(task_id, lid)`.
///
/// Writes are upserts: a later write for the same key replaces the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    pub lid: LinkId,
    pub link_url: String,
    pub final_link: Option<String>,
    pub status: LinkStatus,
    pub error: Option<String>,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    #[serde(default, rename = "best_button_name")]
    pub best_button_name: Option<String>,
    #[serde(default, rename = "all_available_buttons")]
    pub all_available_buttons: Vec<serde_json::Value>,
    pub extracted_by: String,
    pub solved_at: DateTime<Utc>,
}

impl ResultRecord {
    pub fn from_outcome(
        lid: LinkId,
        link_url: impl Into<String>,
        outcome: &LinkOutcome,
        extracted_by: impl Into<String>,
        solved_at: DateTime<Utc>,
    ) -> Self {
        Self {
            lid,
            link_url: link_url.into(),
            final_link: outcome.final_link.clone(),
            status: outcome.status,
            error: outcome.error.clone(),
            logs: outcome.logs.clone(),
            best_button_name: outcome.selection.best_button_name.clone(),
            all_available_buttons: outcome.selection.all_available_buttons.clone(),
            extracted_by: extracted_by.into(),
            solved_at,
        }
    }

    pub fn key(&self) -> String {
        self.lid.record_key()
    }
}
