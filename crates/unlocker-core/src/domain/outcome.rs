//! Outcome model: what a resolver stage returns, and what a link ends up with.
//!
//! This module does not assume any store or transport. It only defines the
//! shapes that the chain produces and the persistence layer records.

use serde::{Deserialize, Serialize};

use super::link::LinkStatus;

/// Severity of a per-link log line. Serialized as the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warn,
    Error,
}

/// One structured log line attached to a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub msg: String,
    #[serde(rename = "type")]
    pub level: LogLevel,
}

impl LogEntry {
    pub fn new(msg: impl Into<String>, level: LogLevel) -> Self {
        Self {
            msg: msg.into(),
            level,
        }
    }
}

/// Auxiliary selection metadata returned by terminal-capable stages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// Name of the chosen variant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_button_name: Option<String>,

    /// Every variant that was observed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all_available_buttons: Vec<serde_json::Value>,
}

/// Result of one call to a resolver collaborator.
///
/// `url` is the next intermediate link for rewriting stages and the final
/// link for terminal stages.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolveOutcome {
    pub success: bool,
    pub url: Option<String>,
    pub message: Option<String>,
    pub selection: Selection,
}

impl ResolveOutcome {
    pub fn success(url: impl Into<String>) -> Self {
        Self {
            success: true,
            url: Some(url.into()),
            message: None,
            selection: Selection::default(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            url: None,
            message: Some(message.into()),
            selection: Selection::default(),
        }
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    /// The url, but only when the call succeeded.
    pub fn resolved_url(&self) -> Option<&str> {
        if self.success {
            self.url.as_deref()
        } else {
            None
        }
    }

    pub fn message_or(&self, fallback: &str) -> String {
        self.message.clone().unwrap_or_else(|| fallback.to_string())
    }
}

/// Terminal outcome for one link after the chain (and retries) finished.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkOutcome {
    pub status: LinkStatus,
    pub final_link: Option<String>,
    pub error: Option<String>,
    pub selection: Selection,
    pub logs: Vec<LogEntry>,
}

impl LinkOutcome {
    pub fn done(final_link: impl Into<String>) -> Self {
        Self {
            status: LinkStatus::Done,
            final_link: Some(final_link.into()),
            error: None,
            selection: Selection::default(),
            logs: Vec::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: LinkStatus::Error,
            final_link: None,
            error: Some(message.into()),
            selection: Selection::default(),
            logs: Vec::new(),
        }
    }

    pub fn deferred(logs: Vec<LogEntry>) -> Self {
        Self {
            status: LinkStatus::Deferred,
            final_link: None,
            error: None,
            selection: Selection::default(),
            logs,
        }
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_logs(mut self, logs: Vec<LogEntry>) -> Self {
        self.logs = logs;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}
