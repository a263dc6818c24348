//! Events - ストリーム出力のイベント
//!
//! 1 イベント = NDJSON の 1 行。
//! 同じ link id のイベントは順序が保証されるが、異なる link id 間では交互に混ざる。

use serde::Serialize;

use super::ids::LinkId;
use super::link::LinkStatus;
use super::outcome::{LinkOutcome, LogEntry, LogLevel};

/// Marker value of the `status` field on the last event for a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Finished {
    Finished,
}

/// Progress event for one link.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StreamEvent {
    /// `{"id", "msg", "type"}`
    Log {
        id: LinkId,
        msg: String,
        #[serde(rename = "type")]
        level: LogLevel,
    },

    /// `{"id", "link"}` - a stage rewrote the current link.
    Intermediate { id: LinkId, link: String },

    /// `{"id", "status", "final", "best_button_name"}`
    Status {
        id: LinkId,
        status: LinkStatus,
        #[serde(rename = "final")]
        final_link: Option<String>,
        best_button_name: Option<String>,
    },

    /// `{"id", "status": "finished"}` - nothing else follows for this id.
    Finished { id: LinkId, status: Finished },
}

impl StreamEvent {
    pub fn log(id: LinkId, entry: &LogEntry) -> Self {
        StreamEvent::Log {
            id,
            msg: entry.msg.clone(),
            level: entry.level,
        }
    }

    pub fn status(id: LinkId, outcome: &LinkOutcome) -> Self {
        StreamEvent::Status {
            id,
            status: outcome.status,
            final_link: outcome.final_link.clone(),
            best_button_name: outcome.selection.best_button_name.clone(),
        }
    }

    pub fn finished(id: LinkId) -> Self {
        StreamEvent::Finished {
            id,
            status: Finished::Finished,
        }
    }

    pub fn link_id(&self) -> &LinkId {
        match self {
            StreamEvent::Log { id, .. }
            | StreamEvent::Intermediate { id, .. }
            | StreamEvent::Status { id, .. }
            | StreamEvent::Finished { id, .. } => id,
        }
    }

    /// One NDJSON line, newline included.
    pub fn to_ndjson(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}
