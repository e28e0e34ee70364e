//! InMemoryQueueBackend - 開発・テスト用のキュー
//!
//! # 振る舞い
//! - `enqueue` したメッセージを FIFO で最大 `max_messages` 件ずつ返す
//! - 受信したメッセージは in-flight になり、`delete_batch` されるまで再受信されない
//!   （可視性タイムアウトが run より長い状態）
//! - `release_in_flight` で可視性タイムアウト切れを再現できる
//! - 削除呼び出しは記録されるので、テストで「何回・何を」消したか確認できる
//! - `fail_next_*` / `reject_delete_of` で転送エラーや部分失敗を注入できる

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::{AckEntry, AckFailure, RawMessage};
use crate::ports::{BackendError, MAX_BATCH_SIZE, QueueBackend};

#[derive(Default)]
struct State {
    visible: VecDeque<RawMessage>,
    in_flight: Vec<RawMessage>,
    deliveries: HashMap<String, u32>,
    deleted: Vec<String>,
    delete_calls: Vec<Vec<AckEntry>>,
    receive_calls: usize,
    rejected_ids: HashSet<String>,
    fail_next_receive: Option<String>,
    fail_next_delete: Option<String>,
}

pub struct InMemoryQueueBackend {
    state: Mutex<State>,
    max_messages: usize,
}

impl InMemoryQueueBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            max_messages: MAX_BATCH_SIZE,
        }
    }

    /// Messages returned per receive, clamped to `1..=MAX_BATCH_SIZE`.
    pub fn with_max_messages(mut self, max_messages: usize) -> Self {
        self.max_messages = max_messages.clamp(1, MAX_BATCH_SIZE);
        self
    }

    pub fn with_messages(self, messages: impl IntoIterator<Item = RawMessage>) -> Self {
        for message in messages {
            self.enqueue(message);
        }
        self
    }

    pub fn enqueue(&self, message: RawMessage) {
        self.lock().visible.push_back(message);
    }

    /// Make every un-deleted received message visible again.
    pub fn release_in_flight(&self) {
        let mut state = self.lock();
        let released = std::mem::take(&mut state.in_flight);
        state.visible.extend(released);
    }

    /// Report `id` as rejected on every delete attempt.
    pub fn reject_delete_of(&self, id: impl Into<String>) {
        self.lock().rejected_ids.insert(id.into());
    }

    pub fn fail_next_receive(&self, message: impl Into<String>) {
        self.lock().fail_next_receive = Some(message.into());
    }

    pub fn fail_next_delete(&self, message: impl Into<String>) {
        self.lock().fail_next_delete = Some(message.into());
    }

    /// Every `delete_batch` call, in order.
    pub fn delete_calls(&self) -> Vec<Vec<AckEntry>> {
        self.lock().delete_calls.clone()
    }

    /// Ids actually removed from the queue.
    pub fn deleted_ids(&self) -> Vec<String> {
        self.lock().deleted.clone()
    }

    /// Ids received but not deleted.
    pub fn in_flight_ids(&self) -> Vec<String> {
        self.lock().in_flight.iter().map(|m| m.id().to_string()).collect()
    }

    pub fn visible_len(&self) -> usize {
        self.lock().visible.len()
    }

    pub fn receive_calls(&self) -> usize {
        self.lock().receive_calls
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InMemoryQueueBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueBackend for InMemoryQueueBackend {
    async fn receive_batch(&self) -> Result<Vec<RawMessage>, BackendError> {
        let mut state = self.lock();
        state.receive_calls += 1;
        if let Some(message) = state.fail_next_receive.take() {
            return Err(BackendError::transport("receive", message));
        }

        let take = self.max_messages.min(state.visible.len());
        let batch: Vec<RawMessage> = state.visible.drain(..take).collect();
        let mut received = Vec::with_capacity(batch.len());
        for message in batch {
            let count = state.deliveries.entry(message.id().to_string()).or_insert(0);
            *count += 1;
            let count = *count;
            state.in_flight.push(message.clone());
            received.push(message.with_receive_count(count));
        }
        Ok(received)
    }

    async fn delete_batch(&self, entries: &[AckEntry]) -> Result<(), BackendError> {
        let mut state = self.lock();
        if let Some(message) = state.fail_next_delete.take() {
            return Err(BackendError::transport("delete", message));
        }
        state.delete_calls.push(entries.to_vec());

        let mut failed = Vec::new();
        for entry in entries {
            if state.rejected_ids.contains(&entry.id) {
                failed.push(AckFailure {
                    id: entry.id.clone(),
                    code: "ReceiptHandleIsInvalid".to_string(),
                    message: None,
                });
                continue;
            }
            state.in_flight.retain(|m| m.id() != entry.id);
            state.deleted.push(entry.id.clone());
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(BackendError::PartialDelete {
                attempted: entries.len(),
                failed,
            })
        }
    }
}
