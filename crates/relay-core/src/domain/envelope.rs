//! Envelope - 通知レコードの解析
//!
//! メッセージ本文は SNS 形式の通知 JSON を想定しています：
//!
//! ```json
//! {
//!   "Type": "Notification",
//!   "MessageId": "5f3c…",
//!   "TopicArn": "arn:aws:sns:eu-west-1:123456789012:orders",
//!   "Subject": "optional",
//!   "Message": "inner payload"
//! }
//! ```
//!
//! - 本文が無い/空/JSON でない/オブジェクトでない/空オブジェクト → `ParseFailure`
//! - `TopicArn` が無いのはエラーではない（どの handler にもマッチしないだけ）
//! - `Message` の中身は解釈しない（payload はそのまま handler へ）

use serde::Serialize;
use serde_json::{Map, Value};

use super::message::RawMessage;

const FIELD_TYPE: &str = "Type";
const FIELD_MESSAGE_ID: &str = "MessageId";
const FIELD_ROUTING_KEY: &str = "TopicArn";
const FIELD_SUBJECT: &str = "Subject";
const FIELD_PAYLOAD: &str = "Message";

/// Why a body could not be turned into an [`Envelope`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseFailure {
    #[error("message body is missing")]
    MissingBody,

    #[error("message body is empty")]
    EmptyBody,

    #[error("message body is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("message body is not a JSON object")]
    NotAnObject,

    #[error("message body is an empty record")]
    EmptyRecord,
}

/// Parsed notification record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    kind: Option<String>,
    message_id: String,
    routing_key: Option<String>,
    subject: Option<String>,
    payload: Value,
}

impl Envelope {
    /// Decode the body of `raw`.
    ///
    /// `message_id` falls back to the backend id when the record has none.
    pub fn parse(raw: &RawMessage) -> Result<Self, ParseFailure> {
        let body = raw.body().ok_or(ParseFailure::MissingBody)?;
        if body.trim().is_empty() {
            return Err(ParseFailure::EmptyBody);
        }

        let decoded: Value =
            serde_json::from_str(body).map_err(|e| ParseFailure::InvalidJson(e.to_string()))?;
        let Value::Object(mut record) = decoded else {
            return Err(ParseFailure::NotAnObject);
        };
        if record.is_empty() {
            return Err(ParseFailure::EmptyRecord);
        }

        Ok(Self {
            kind: string_field(&record, FIELD_TYPE),
            message_id: string_field(&record, FIELD_MESSAGE_ID)
                .unwrap_or_else(|| raw.id().to_string()),
            routing_key: string_field(&record, FIELD_ROUTING_KEY),
            subject: string_field(&record, FIELD_SUBJECT),
            payload: record.remove(FIELD_PAYLOAD).unwrap_or(Value::Null),
        })
    }

    /// Notification type indicator (`"Notification"`, ...).
    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// The publish-topic identifier used for routing.
    pub fn routing_key(&self) -> Option<&str> {
        self.routing_key.as_deref()
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }
}

/// Non-empty string value of `key`; anything else counts as absent.
fn string_field(record: &Map<String, Value>, key: &str) -> Option<String> {
    record
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
