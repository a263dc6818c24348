//! Resolver - ステージ表とチェーン
//!
//! - `DomainSet`: URL の部分一致でドメイン群を判定
//! - `StageTable`: (述語, 変換) の順序付きリスト
//! - `ResolverChain`: 1 リンクを終端状態まで進める状態機械
//! - `ResolverRegistry`: capability 名 → リモートリゾルバ

pub mod chain;
pub mod domains;
pub mod journal;
pub mod registry;
pub mod stage;

pub use chain::ResolverChain;
pub use domains::DomainSet;
pub use journal::LinkJournal;
pub use registry::{Capability, RegistryError, ResolverRegistry};
pub use stage::{BypassLoop, BypassRoute, Stage, StageKind, StageTable};
