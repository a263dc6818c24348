//! Ports - 抽象化レイヤー
//!
//! 各 trait は外部システム（ドキュメントストア、unlock サービス、
//! ストリームの consumer）へのインターフェースを提供し、実装の詳細を隠蔽します。

pub mod clock;
pub mod event_sink;
pub mod id_generator;
pub mod resolver;
pub mod task_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::event_sink::EventSink;
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::resolver::Resolver;
pub use self::task_store::TaskStore;
