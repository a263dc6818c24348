//! Event sinks.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::{EventSinkError, StreamEvent};
use crate::ports::EventSink;

/// Forwards events to an unbounded channel. Fails once the receiver is gone.
#[derive(Clone)]
pub struct ChannelEventSink {
    tx: mpsc::UnboundedSender<StreamEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: mpsc::UnboundedSender<StreamEvent>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StreamEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl EventSink for ChannelEventSink {
    async fn emit(&self, event: StreamEvent) -> Result<(), EventSinkError> {
        self.tx.send(event).map_err(|_| EventSinkError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LinkId;

    #[tokio::test]
    async fn forwards_until_receiver_drops() {
        let (sink, mut rx) = ChannelEventSink::channel();
        sink.emit(StreamEvent::finished(LinkId::Index(1))).await.unwrap();
        assert_eq!(rx.recv().await, Some(StreamEvent::finished(LinkId::Index(1))));

        drop(rx);
        assert_eq!(
            sink.emit(StreamEvent::finished(LinkId::Index(2))).await,
            Err(EventSinkError::Closed)
        );
    }
}
