//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryQueueBackend**: 開発・テスト用のキュー
//! - **SqsQueueBackend**: Amazon SQS（feature `sqs`）
//! - **TracingEventSink / MemoryEventSink / NoopEventSink**

pub mod event_sink;
pub mod inmem_backend;
#[cfg(feature = "sqs")]
pub mod sqs_backend;

pub use self::event_sink::{MemoryEventSink, NoopEventSink, TracingEventSink};
pub use self::inmem_backend::InMemoryQueueBackend;
#[cfg(feature = "sqs")]
pub use self::sqs_backend::SqsQueueBackend;
