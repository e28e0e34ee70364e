//! SqsQueueBackend - Amazon SQS 実装（feature `sqs`）
//!
//! - receive: `ReceiveMessage`（MaxNumberOfMessages ≤ 10, ApproximateReceiveCount 付き）
//! - delete: `DeleteMessageBatch`（Entries の Id には MessageId を使う）
//!
//! MessageId / ReceiptHandle の無いメッセージは ack できないので、warn を出して
//! そのメッセージだけ捨てます。同じバッチの他のメッセージはそのまま流します。
//!
//! 転送層のリトライは SDK の設定に任せ、ここでは行いません。

use async_trait::async_trait;
use aws_sdk_sqs::Client;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::{
    BatchResultErrorEntry, DeleteMessageBatchRequestEntry, Message, MessageSystemAttributeName,
};

use crate::config::QueueConfig;
use crate::domain::{AckEntry, AckFailure, RawMessage};
use crate::ports::{BackendError, QueueBackend};

pub struct SqsQueueBackend {
    client: Client,
    queue_url: String,
    max_messages: i32,
    wait_time_seconds: i32,
    visibility_timeout_seconds: Option<i32>,
}

impl SqsQueueBackend {
    pub fn new(client: Client, config: &QueueConfig) -> Self {
        Self {
            client,
            queue_url: config.url.clone(),
            max_messages: i32::from(config.max_messages),
            wait_time_seconds: i32::from(config.wait_time_seconds),
            visibility_timeout_seconds: visibility_timeout(config),
        }
    }

    /// Build a client from the default AWS credential/region chain.
    pub async fn from_env(config: &QueueConfig) -> Self {
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(Client::new(&sdk_config), config)
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }
}

// 範囲外は SQS 側で弾かれるので、ここでは i32 に収めるだけ
fn visibility_timeout(config: &QueueConfig) -> Option<i32> {
    config
        .visibility_timeout_seconds
        .map(|s| i32::try_from(s).unwrap_or(i32::MAX))
}

fn into_raw_message(message: &Message) -> Result<RawMessage, BackendError> {
    let id = message
        .message_id()
        .ok_or_else(|| BackendError::InvalidMessage("message without MessageId".to_string()))?;
    let receipt = message.receipt_handle().ok_or_else(|| {
        BackendError::InvalidMessage(format!("message {id} without ReceiptHandle"))
    })?;

    let raw = RawMessage::new(id, receipt, message.body().map(str::to_string));
    let receive_count = message
        .attributes()
        .and_then(|attrs| attrs.get(&MessageSystemAttributeName::ApproximateReceiveCount))
        .and_then(|count| count.parse::<u32>().ok());

    Ok(match receive_count {
        Some(count) => raw.with_receive_count(count),
        None => raw,
    })
}

fn convert_batch(messages: &[Message]) -> Vec<RawMessage> {
    messages
        .iter()
        .filter_map(|message| match into_raw_message(message) {
            Ok(raw) => Some(raw),
            Err(err) => {
                tracing::warn!(error = %err, "skipping message that cannot be acknowledged");
                None
            }
        })
        .collect()
}

fn request_entries(
    entries: &[AckEntry],
) -> Result<Vec<DeleteMessageBatchRequestEntry>, BackendError> {
    entries
        .iter()
        .map(|entry| {
            DeleteMessageBatchRequestEntry::builder()
                .id(&entry.id)
                .receipt_handle(&entry.delete_token)
                .build()
                .map_err(|e| BackendError::transport("delete", e.to_string()))
        })
        .collect()
}

fn delete_outcome(attempted: usize, failed: &[BatchResultErrorEntry]) -> Result<(), BackendError> {
    if failed.is_empty() {
        return Ok(());
    }
    Err(BackendError::PartialDelete {
        attempted,
        failed: failed
            .iter()
            .map(|f| AckFailure {
                id: f.id().to_string(),
                code: f.code().to_string(),
                message: f.message().map(str::to_string),
            })
            .collect(),
    })
}

#[async_trait]
impl QueueBackend for SqsQueueBackend {
    async fn receive_batch(&self) -> Result<Vec<RawMessage>, BackendError> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(self.max_messages)
            .wait_time_seconds(self.wait_time_seconds)
            .set_visibility_timeout(self.visibility_timeout_seconds)
            .message_system_attribute_names(MessageSystemAttributeName::ApproximateReceiveCount)
            .send()
            .await
            .map_err(|e| BackendError::transport("receive", DisplayErrorContext(e).to_string()))?;

        Ok(convert_batch(output.messages()))
    }

    async fn delete_batch(&self, entries: &[AckEntry]) -> Result<(), BackendError> {
        let batch = request_entries(entries)?;

        let output = self
            .client
            .delete_message_batch()
            .queue_url(&self.queue_url)
            .set_entries(Some(batch))
            .send()
            .await
            .map_err(|e| BackendError::transport("delete", DisplayErrorContext(e).to_string()))?;

        delete_outcome(entries.len(), output.failed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqs_message(id: Option<&str>, receipt: Option<&str>) -> Message {
        Message::builder()
            .set_message_id(id.map(str::to_string))
            .set_receipt_handle(receipt.map(str::to_string))
            .body("{}")
            .build()
    }

    fn error_entry(id: &str, code: &str) -> BatchResultErrorEntry {
        BatchResultErrorEntry::builder()
            .id(id)
            .code(code)
            .sender_fault(true)
            .message("receipt handle expired")
            .build()
            .unwrap()
    }

    #[test]
    fn visibility_timeout_saturates_instead_of_wrapping() {
        let mut config = QueueConfig {
            url: "q".to_string(),
            ..QueueConfig::default()
        };
        assert_eq!(visibility_timeout(&config), None);

        config.visibility_timeout_seconds = Some(60);
        assert_eq!(visibility_timeout(&config), Some(60));

        config.visibility_timeout_seconds = Some(u32::MAX);
        assert_eq!(visibility_timeout(&config), Some(i32::MAX));
    }

    #[test]
    fn converts_message_with_receive_count() {
        let message = Message::builder()
            .message_id("m-1")
            .receipt_handle("r-1")
            .body("{\"TopicArn\":\"t\"}")
            .attributes(MessageSystemAttributeName::ApproximateReceiveCount, "3")
            .build();

        let raw = into_raw_message(&message).unwrap();

        assert_eq!(raw.id(), "m-1");
        assert_eq!(raw.delete_token(), "r-1");
        assert_eq!(raw.body(), Some("{\"TopicArn\":\"t\"}"));
        assert_eq!(raw.receive_count(), Some(3));
    }

    #[test]
    fn unparsable_receive_count_is_ignored() {
        let message = Message::builder()
            .message_id("m-1")
            .receipt_handle("r-1")
            .attributes(MessageSystemAttributeName::ApproximateReceiveCount, "many")
            .build();

        let raw = into_raw_message(&message).unwrap();

        assert_eq!(raw.receive_count(), None);
        assert_eq!(raw.body(), None);
    }

    #[test]
    fn message_without_id_or_receipt_is_invalid() {
        let no_id = into_raw_message(&sqs_message(None, Some("r-1"))).unwrap_err();
        assert!(matches!(no_id, BackendError::InvalidMessage(_)));

        let no_receipt = into_raw_message(&sqs_message(Some("m-2"), None)).unwrap_err();
        assert!(no_receipt.to_string().contains("m-2"));
    }

    #[test]
    fn unusable_message_does_not_drop_the_rest_of_the_batch() {
        let batch = [
            sqs_message(Some("m-1"), Some("r-1")),
            sqs_message(Some("m-2"), None),
            sqs_message(None, Some("r-3")),
            sqs_message(Some("m-4"), Some("r-4")),
        ];

        let raw = convert_batch(&batch);

        let ids: Vec<&str> = raw.iter().map(RawMessage::id).collect();
        assert_eq!(ids, vec!["m-1", "m-4"]);
    }

    #[test]
    fn request_entries_use_message_id_and_receipt() {
        let entries = request_entries(&[AckEntry::new("m-1", "r-1"), AckEntry::new("m-2", "r-2")])
            .unwrap();

        let pairs: Vec<(&str, &str)> = entries
            .iter()
            .map(|e| (e.id(), e.receipt_handle()))
            .collect();
        assert_eq!(pairs, vec![("m-1", "r-1"), ("m-2", "r-2")]);
    }

    #[test]
    fn failed_entries_become_partial_delete() {
        assert!(delete_outcome(2, &[]).is_ok());

        let err = delete_outcome(2, &[error_entry("m-2", "ReceiptHandleIsInvalid")]).unwrap_err();

        let BackendError::PartialDelete { attempted, failed } = err else {
            panic!("expected PartialDelete, got {err:?}");
        };
        assert_eq!(attempted, 2);
        assert_eq!(
            failed,
            vec![AckFailure {
                id: "m-2".to_string(),
                code: "ReceiptHandleIsInvalid".to_string(),
                message: Some("receipt handle expired".to_string()),
            }]
        );
    }
}
