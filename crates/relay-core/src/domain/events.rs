//! Events - 診断イベント
//!
//! コアはイベントの「構造」だけを決めます。フォーマットや保存先は
//! `ports::EventSink` の実装側の責務です。
//!
//! # イベント種類
//! - RunStart / RunEnd: drain 1 回分の開始と終了（RunEnd に processed/failed）
//! - BatchReceived / AckFlushed: バッチ単位の受信と削除
//! - HandlerInvoked: handler を呼ぶ直前
//! - DispatchError: 1 メッセージの失敗（kind + context）
//! - AckPartialFailure: バッチ削除の一部がバックエンドに拒否された

use serde::Serialize;

use super::errors::{DispatchContext, DispatchErrorKind};
use super::ids::RunId;

/// One rejected entry of a batch delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AckFailure {
    pub id: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum RelayEvent {
    RunStart {
        run_id: RunId,
    },
    BatchReceived {
        run_id: RunId,
        size: usize,
    },
    HandlerInvoked {
        run_id: RunId,
        message_id: String,
        routing_key: String,
        handler: String,
    },
    DispatchError {
        run_id: RunId,
        kind: DispatchErrorKind,
        context: DispatchContext,
        #[serde(skip_serializing_if = "Option::is_none")]
        cause: Option<String>,
    },
    AckFlushed {
        run_id: RunId,
        count: usize,
    },
    AckPartialFailure {
        run_id: RunId,
        failed: Vec<AckFailure>,
    },
    RunEnd {
        run_id: RunId,
        processed: u64,
        failed: u64,
    },
}

impl RelayEvent {
    /// Short event name, as used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RunStart { .. } => "run-start",
            Self::BatchReceived { .. } => "batch-received",
            Self::HandlerInvoked { .. } => "handler-invoked",
            Self::DispatchError { .. } => "dispatch-error",
            Self::AckFlushed { .. } => "ack-flushed",
            Self::AckPartialFailure { .. } => "ack-partial-failure",
            Self::RunEnd { .. } => "run-end",
        }
    }

    pub fn run_id(&self) -> RunId {
        match self {
            Self::RunStart { run_id }
            | Self::BatchReceived { run_id, .. }
            | Self::HandlerInvoked { run_id, .. }
            | Self::DispatchError { run_id, .. }
            | Self::AckFlushed { run_id, .. }
            | Self::AckPartialFailure { run_id, .. }
            | Self::RunEnd { run_id, .. } => *run_id,
        }
    }
}
