//! relay-core
//!
//! キューを空になるまで読み、エンベロープの routing key で handler に振り分け、
//! 成功したメッセージをバッチでまとめて削除するコンシューマーのコア部分です。
//!
//! # モジュール構成
//! - **domain**: メッセージ、エンベロープ、エラー分類、診断イベント、RunStats
//! - **ports**: 外部との境界（QueueBackend, MessageHandler, EventSink, Clock, IdGenerator）
//! - **app**: HandlerRegistry, Dispatcher, AckBuffer, PollLoop, RelayBuilder
//! - **impls**: InMemoryQueueBackend, SqsQueueBackend（feature `sqs`）, EventSink 実装
//! - **config**: TOML 設定
//! - **error**: run 全体を止めるエラー

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod ports;

pub use app::{PollLoop, RelayBuilder};
pub use config::RelayConfig;
pub use error::RelayError;
