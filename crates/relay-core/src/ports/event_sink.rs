//! EventSink port - 診断イベントの出力先
//!
//! # 実装
//! - TracingEventSink: tracing に流す（既定）
//! - MemoryEventSink: テスト用に溜めておく
//! - NoopEventSink: 何もしない

use crate::domain::RelayEvent;

/// EventSink は診断イベントを受け取る
///
/// 出力は失敗しても run を止めない前提なので、戻り値はありません。
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &RelayEvent);
}
