//! App - アプリケーション層
//!
//! ports を組み合わせてリンク解決パイプラインを実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder / App**: ワイヤリングと 2 つのエントリポイント
//! - **router**: pending リンクを timer / direct に振り分け
//! - **RetrySupervisor**: タイムアウト + 1 回の再試行 + 1 回の保存
//! - **PersistenceAdapter**: upsert・原子的カウンタ・完了判定
//! - **DirectExecutor / SequentialExecutor**: 並行実行 / 時間予算付き逐次実行
//! - **ResultOverlay**: ライブ結果をストアの読み取りに重ねるキャッシュ

pub mod batch;
pub mod builder;
pub mod context;
pub mod direct;
pub mod overlay;
pub mod persistence;
pub mod router;
pub mod sequential;
pub mod stream;
pub mod supervisor;

// 主要な型を再エクスポート
pub use self::batch::SolveTaskRequest;
pub use self::builder::{App, AppBuilder, BuildError};
pub use self::context::{RunContext, DEFAULT_EXTRACTED_BY};
pub use self::direct::DirectExecutor;
pub use self::overlay::{LinkOverlay, OverlaySink, ResultOverlay};
pub use self::persistence::PersistenceAdapter;
pub use self::router::{route, Routed};
pub use self::sequential::{SequentialExecutor, SequentialReport};
pub use self::stream::StreamRequest;
pub use self::supervisor::{RetrySupervisor, MAX_ATTEMPTS};
