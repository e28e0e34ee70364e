//! AckBuffer - 削除トークンを溜めてまとめて消す
//!
//! 1 回の受信バッチで成功したメッセージの `AckEntry` を溜め、
//! `flush()` でバックエンドの `delete_batch` を 1 回だけ呼びます。
//! 空なら呼びません。

use crate::domain::AckEntry;
use crate::ports::{BackendError, MAX_BATCH_SIZE, QueueBackend};

#[derive(Debug, Default)]
pub struct AckBuffer {
    entries: Vec<AckEntry>,
}

impl AckBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: AckEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[AckEntry] {
        &self.entries
    }

    /// Delete everything buffered and clear the buffer.
    ///
    /// Returns how many entries were sent. More than [`MAX_BATCH_SIZE`]
    /// entries are sent in consecutive chunks. The buffer is cleared even
    /// when the backend fails: the receipts stay on the queue and come back
    /// on a later receive, so there is nothing to retry locally.
    pub async fn flush(&mut self, backend: &dyn QueueBackend) -> Result<usize, BackendError> {
        if self.entries.is_empty() {
            return Ok(0);
        }

        let entries = std::mem::take(&mut self.entries);
        let mut rejected = Vec::new();
        for chunk in entries.chunks(MAX_BATCH_SIZE) {
            match backend.delete_batch(chunk).await {
                Ok(()) => {}
                Err(BackendError::PartialDelete { failed, .. }) => rejected.extend(failed),
                Err(err) => return Err(err),
            }
        }

        if rejected.is_empty() {
            tracing::debug!(count = entries.len(), "acknowledged batch");
            Ok(entries.len())
        } else {
            Err(BackendError::PartialDelete {
                attempted: entries.len(),
                failed: rejected,
            })
        }
    }
}
