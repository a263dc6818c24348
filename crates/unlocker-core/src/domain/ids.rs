//! Domain identifiers (strongly-typed IDs).
//!
//! # 2 種類の ID
//! - **外部 ID**: `TaskId` / `LinkId` はドキュメントストア側で採番されたもの（文字列 or 数値）
//! - **内部 ID**: `RunId` / `AttemptId` は ULID ベースで、このプロセス内のトレース用
//!
//! ## Phantom Type パターン
//! `Id<T>` というジェネリック型で共通実装を提供しつつ、
//! `T` は実行時には使わない（PhantomData）マーカー型として、
//! コンパイル時の型安全性を提供します。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
///
/// Display で使うプレフィックス（"run-", "attempt-"）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

// ========================================
// マーカー型の定義
// ========================================

/// One invocation of an entry point (batch or stream).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Run {}

impl IdMarker for Run {
    fn prefix() -> &'static str {
        "run-"
    }
}

/// One try of the resolver chain for a single link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Attempt {}

impl IdMarker for Attempt {
    fn prefix() -> &'static str {
        "attempt-"
    }
}

pub type RunId = Id<Run>;
pub type AttemptId = Id<Attempt>;

/// Identifier of a task document in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Identifier of a link within its task (`lid`).
///
/// Callers send either the link's index or an opaque key, so both are accepted
/// and kept as-is on the wire. Result records are keyed by the display form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LinkId {
    Index(u64),
    Key(String),
}

impl LinkId {
    /// Key used for the result sub-record.
    pub fn record_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkId::Index(i) => write!(f, "{i}"),
            LinkId::Key(k) => f.write_str(k),
        }
    }
}

impl From<u64> for LinkId {
    fn from(i: u64) -> Self {
        LinkId::Index(i)
    }
}

impl From<&str> for LinkId {
    fn from(s: &str) -> Self {
        LinkId::Key(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let run = RunId::from_ulid(Ulid::new());
        let attempt = AttemptId::from_ulid(Ulid::new());

        assert!(run.to_string().starts_with("run-"));
        assert!(attempt.to_string().starts_with("attempt-"));
        // let _: RunId = attempt; // <- does not compile
    }

    #[test]
    fn link_id_accepts_numbers_and_strings() {
        let ids: Vec<LinkId> = serde_json::from_str(r#"[3, "abc"]"#).unwrap();
        assert_eq!(ids, vec![LinkId::Index(3), LinkId::Key("abc".to_string())]);
        assert_eq!(ids[0].record_key(), "3");
        assert_eq!(ids[1].record_key(), "abc");
    }

    #[test]
    fn link_id_serializes_back_to_original_shape() {
        assert_eq!(serde_json::to_string(&LinkId::Index(7)).unwrap(), "7");
        assert_eq!(serde_json::to_string(&LinkId::from("x")).unwrap(), "\"x\"");
    }

    #[test]
    fn phantom_data_does_not_consume_memory() {
        use std::mem::size_of;
        assert_eq!(size_of::<RunId>(), size_of::<Ulid>());
        assert_eq!(size_of::<AttemptId>(), size_of::<Ulid>());
    }
}
