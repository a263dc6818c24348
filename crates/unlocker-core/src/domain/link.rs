//! Link model: one candidate hosting URL inside a task.

use serde::{Deserialize, Serialize};

use super::ids::LinkId;
use super::outcome::LogEntry;

/// Link status.
///
/// State transitions:
/// - Pending -> Processing -> Done
/// - Pending -> Processing -> Error
/// - Pending -> Deferred -> (next invocation) Processing -> ...
///
/// `Deferred` is terminal for one invocation only and never counts towards
/// `completedLinksCount`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    Pending,
    Processing,
    #[serde(alias = "success")]
    Done,
    #[serde(alias = "failed")]
    Error,
    Deferred,
}

impl LinkStatus {
    /// Should the router pick this link up again?
    pub fn is_resumable(self) -> bool {
        matches!(
            self,
            LinkStatus::Pending | LinkStatus::Processing | LinkStatus::Deferred
        )
    }

    pub fn is_success(self) -> bool {
        self == LinkStatus::Done
    }

    /// Counted towards the task's completion counter.
    pub fn is_counted(self) -> bool {
        self != LinkStatus::Deferred
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LinkStatus::Pending => "pending",
            LinkStatus::Processing => "processing",
            LinkStatus::Done => "done",
            LinkStatus::Error => "error",
            LinkStatus::Deferred => "deferred",
        }
    }
}

/// A link as stored on the task document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    /// Missing on older documents; the link's index is used instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<LinkId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Source URL.
    pub link: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LinkStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_link: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<LogEntry>,

    #[serde(
        default,
        rename = "best_button_name",
        skip_serializing_if = "Option::is_none"
    )]
    pub best_button_name: Option<String>,

    #[serde(
        default,
        rename = "all_available_buttons",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub all_available_buttons: Vec<serde_json::Value>,
}

impl Link {
    pub fn new(link: impl Into<String>) -> Self {
        Self {
            id: None,
            name: None,
            link: link.into(),
            status: None,
            final_link: None,
            logs: Vec::new(),
            best_button_name: None,
            all_available_buttons: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<LinkId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_status(mut self, status: LinkStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Absent status counts as pending.
    pub fn is_pending(&self) -> bool {
        self.status.is_none_or(LinkStatus::is_resumable)
    }
}

/// A link as handed to an entry point: id, display name and URL are required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkInput {
    pub id: LinkId,
    pub name: String,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LinkStatus>,
}

impl LinkInput {
    pub fn new(id: impl Into<LinkId>, name: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            link: link.into(),
            status: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status.is_none_or(LinkStatus::is_resumable)
    }
}
