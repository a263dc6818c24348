//! EventSink port - ストリームイベントの出力先
//!
//! 送信失敗（consumer の切断など）はパイプライン側で握りつぶす。
//! ストアへの保存はイベント配送とは独立して完了する。

use async_trait::async_trait;

use crate::domain::{EventSinkError, StreamEvent};

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: StreamEvent) -> Result<(), EventSinkError>;
}
