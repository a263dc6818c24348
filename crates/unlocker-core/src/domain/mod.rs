//! Domain model (IDs, tasks, links, outcomes, events, errors).

pub mod errors;
pub mod events;
pub mod ids;
pub mod link;
pub mod outcome;
pub mod task;

pub use self::errors::{EventSinkError, StoreError, UnlockError};
pub use self::events::StreamEvent;
pub use self::ids::{AttemptId, LinkId, RunId, TaskId};
pub use self::link::{Link, LinkInput, LinkStatus};
pub use self::outcome::{LinkOutcome, LogEntry, LogLevel, ResolveOutcome, Selection};
pub use self::task::{Counter, ResultRecord, TaskPatch, TaskRecord, TaskStatus};
