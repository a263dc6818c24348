//! Resolver port - リモートの unlock サービス
//!
//! 各ステージは capability で型付けされたリモート呼び出し 1 つに対応する。
//! 実装（HTTP など）は impls 側。

use async_trait::async_trait;

use crate::domain::{ResolveOutcome, UnlockError};

/// `resolve(url) -> {success, nextOrFinalUrl, message, selection}`
///
/// `Err` means the call itself failed (transport, decode, ...). A resolver
/// that answered "no" returns `Ok` with `success == false`.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, url: &str) -> Result<ResolveOutcome, UnlockError>;
}
