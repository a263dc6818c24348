//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryTaskStore**: 単一ロックの正本（テスト・CLI 用、スナップショット対応）
//! - **HttpResolver**: `GET {endpoint}?url=` のリモートリゾルバ
//! - **ChannelEventSink**: mpsc チャネルへのイベント転送

pub mod http_resolver;
pub mod memory_store;
pub mod sinks;

// 主要な型を再エクスポート
pub use self::http_resolver::HttpResolver;
pub use self::memory_store::{InMemoryTaskStore, StoreSnapshot, StoredTask};
pub use self::sinks::ChannelEventSink;
