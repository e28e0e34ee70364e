//! Ports - 外部との境界
//!
//! 各 trait はコアの外にいる協力者（キューの転送層、handler 本体、
//! ログ/メトリクスの出力先、時計）へのインターフェースです。
//! 実装は `impls` か、ホスト側のクレートに置きます。

pub mod clock;
pub mod event_sink;
pub mod handler;
pub mod id_generator;
pub mod queue_backend;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::event_sink::EventSink;
pub use self::handler::MessageHandler;
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::queue_backend::{BackendError, MAX_BATCH_SIZE, QueueBackend};
