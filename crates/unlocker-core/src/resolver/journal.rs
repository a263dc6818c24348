//! Per-link log journal.
//!
//! Every log line lands in the journal (and later in the result record). When
//! a sink is attached the same line is also emitted as a stream event, in the
//! order it was written.

use std::sync::Arc;

use crate::domain::{LinkId, LinkOutcome, LogEntry, LogLevel, StreamEvent};
use crate::ports::EventSink;

pub struct LinkJournal {
    lid: LinkId,
    entries: Vec<LogEntry>,
    sink: Option<Arc<dyn EventSink>>,
}

impl LinkJournal {
    pub fn new(lid: LinkId, sink: Option<Arc<dyn EventSink>>) -> Self {
        Self {
            lid,
            entries: Vec::new(),
            sink,
        }
    }

    pub async fn log(&mut self, msg: impl Into<String>, level: LogLevel) {
        let entry = LogEntry::new(msg, level);
        self.emit(StreamEvent::log(self.lid.clone(), &entry)).await;
        self.entries.push(entry);
    }

    pub async fn info(&mut self, msg: impl Into<String>) {
        self.log(msg, LogLevel::Info).await;
    }

    pub async fn error(&mut self, msg: impl Into<String>) {
        self.log(msg, LogLevel::Error).await;
    }

    /// A stage rewrote the current link.
    pub async fn intermediate(&mut self, url: &str) {
        self.emit(StreamEvent::Intermediate {
            id: self.lid.clone(),
            link: url.to_string(),
        })
        .await;
    }

    pub async fn status(&self, outcome: &LinkOutcome) {
        self.emit(StreamEvent::status(self.lid.clone(), outcome)).await;
    }

    pub async fn finished(&self) {
        self.emit(StreamEvent::finished(self.lid.clone())).await;
    }

    async fn emit(&self, event: StreamEvent) {
        let Some(sink) = &self.sink else {
            return;
        };
        if let Err(e) = sink.emit(event).await {
            tracing::debug!(lid = %self.lid, error = %e, "stream event dropped");
        }
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSink;

    #[tokio::test]
    async fn journal_without_sink_only_records() {
        let mut j = LinkJournal::new(LinkId::Index(0), None);
        j.info("a").await;
        j.error("b").await;
        assert_eq!(j.entries().len(), 2);
        assert_eq!(j.entries()[1].level, LogLevel::Error);
    }

    #[tokio::test]
    async fn journal_mirrors_lines_to_sink_in_order() {
        let sink = Arc::new(RecordingSink::default());
        let mut j = LinkJournal::new(LinkId::Index(4), Some(sink.clone()));
        j.info("first").await;
        j.intermediate("https://next").await;
        j.info("second").await;
        j.finished().await;

        let events = sink.events();
        assert_eq!(events.len(), 4);
        assert!(matches!(&events[0], StreamEvent::Log { msg, .. } if msg == "first"));
        assert!(matches!(&events[1], StreamEvent::Intermediate { link, .. } if link == "https://next"));
        assert!(matches!(&events[3], StreamEvent::Finished { .. }));
        // finished/intermediate are not log lines
        assert_eq!(j.entries().len(), 2);
    }

    #[tokio::test]
    async fn sink_failures_are_swallowed() {
        let sink = Arc::new(RecordingSink::closed());
        let mut j = LinkJournal::new(LinkId::Index(0), Some(sink.clone()));
        j.info("still recorded").await;
        assert_eq!(j.entries().len(), 1);
        assert!(sink.events().is_empty());
    }
}
