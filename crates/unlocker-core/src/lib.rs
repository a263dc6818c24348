//! unlocker-core
//!
//! Link resolution pipeline: routes a task's pending links, drives each one
//! through a table of remote unlock stages, and keeps the task document's
//! completion bookkeeping consistent across invocations.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, task, link, outcome, events, errors）
//! - **ports**: 抽象化レイヤー（TaskStore, Resolver, EventSink, Clock, IdGenerator）
//! - **resolver**: ステージ表・チェーン・リゾルバ登録
//! - **app**: ルーティング・実行器・再試行・保存・エントリポイント
//! - **impls**: 実装（InMemoryTaskStore, HttpResolver, ChannelEventSink）
//! - **config**: 設定の読み込み（YAML + 環境変数）
//! - **observability**: 実行結果の集計

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod resolver;

#[cfg(test)]
pub(crate) mod testing;
