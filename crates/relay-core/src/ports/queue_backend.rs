//! QueueBackend port - キューの受信とバッチ削除
//!
//! 転送層（ネットワーク、署名、リトライ）は実装側に閉じ込めます。
//! コアが知っているのは「最大 N 件受け取る」「まとめて消す」の 2 操作だけです。
//!
//! # 実装
//! - `impls::InMemoryQueueBackend`（開発・テスト用）
//! - `impls::SqsQueueBackend`（feature `sqs`）

use async_trait::async_trait;

use crate::domain::{AckEntry, AckFailure, RawMessage};

/// Upper bound the backend accepts for one receive or delete call.
pub const MAX_BATCH_SIZE: usize = 10;

/// Errors surfaced by a queue backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The call itself failed (network, auth, throttling, ...).
    #[error("queue transport error during {operation}: {message}")]
    Transport {
        operation: &'static str,
        message: String,
    },

    /// Some entries of a batch delete were rejected; the rest were applied.
    #[error("{} of {attempted} delete entries were rejected", .failed.len())]
    PartialDelete {
        attempted: usize,
        failed: Vec<AckFailure>,
    },

    /// The backend returned a message we cannot acknowledge (no id/token).
    #[error("backend returned an unusable message: {0}")]
    InvalidMessage(String),
}

impl BackendError {
    pub fn transport(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Transport {
            operation,
            message: message.into(),
        }
    }

    /// `true` when the run must stop.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::PartialDelete { .. })
    }
}

/// QueueBackend は受信とバッチ削除だけを提供する
#[async_trait]
pub trait QueueBackend: Send + Sync {
    /// Receive up to [`MAX_BATCH_SIZE`] messages.
    ///
    /// An empty vector means nothing is currently available; that is the
    /// poll loop's stop signal, not an error.
    async fn receive_batch(&self) -> Result<Vec<RawMessage>, BackendError>;

    /// Delete the given receipts in one call.
    ///
    /// Callers never pass an empty slice. Implementations report rejected
    /// entries with [`BackendError::PartialDelete`] without undoing the
    /// accepted ones.
    async fn delete_batch(&self, entries: &[AckEntry]) -> Result<(), BackendError>;
}
