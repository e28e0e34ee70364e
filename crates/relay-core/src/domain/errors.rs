//! Errors - メッセージ単位のエラー
//!
//! ここにあるのは「1 メッセージだけ失敗させる」エラーです。
//! Dispatcher の境界で `DispatchError` に変換され、カウンタと診断イベントになります。
//! バックエンド（転送層）のエラーは `ports::queue_backend::BackendError` を参照。

use std::fmt;

use serde::Serialize;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure raised by a handler while processing one message.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A handler unit could not be constructed.
#[derive(Debug, thiserror::Error)]
#[error("failed to construct handler '{identifier}': {reason}")]
pub struct FactoryError {
    pub identifier: String,
    pub reason: String,
}

impl FactoryError {
    pub fn new(identifier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            reason: reason.into(),
        }
    }
}

/// DispatchErrorKind は失敗の分類
///
/// どちらの場合もメッセージは ack されず、バックエンドに残って再配送を待ちます。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchErrorKind {
    /// Body missing or undecodable.
    PayloadUnavailable,
    /// The resolved handler returned an error.
    HandlerFailed,
}

impl fmt::Display for DispatchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PayloadUnavailable => f.write_str("payload_unavailable"),
            Self::HandlerFailed => f.write_str("handler_failed"),
        }
    }
}

/// Diagnostic context attached to a [`DispatchError`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchContext {
    /// Backend-assigned id of the receipt.
    pub backend_id: String,
    /// Message id from the envelope, when it could be decoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing_key: Option<String>,
    /// Identifier of the handler that failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receive_count: Option<u32>,
}

/// One message could not be processed.
#[derive(Debug, thiserror::Error)]
#[error("{}", kind_message(.kind))]
pub struct DispatchError {
    pub kind: DispatchErrorKind,
    pub context: DispatchContext,
    /// Underlying cause (parse failure or handler error).
    #[source]
    pub source: Option<BoxError>,
}

fn kind_message(kind: &DispatchErrorKind) -> &'static str {
    match kind {
        DispatchErrorKind::PayloadUnavailable => "payload is not available",
        DispatchErrorKind::HandlerFailed => "handler failed",
    }
}

impl DispatchError {
    pub fn payload_unavailable(context: DispatchContext, cause: impl Into<BoxError>) -> Self {
        Self {
            kind: DispatchErrorKind::PayloadUnavailable,
            context,
            source: Some(cause.into()),
        }
    }

    pub fn handler_failed(context: DispatchContext, cause: HandlerError) -> Self {
        Self {
            kind: DispatchErrorKind::HandlerFailed,
            context,
            source: Some(Box::new(cause)),
        }
    }

    /// Human-readable cause, if any.
    pub fn cause(&self) -> Option<String> {
        self.source.as_ref().map(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn payload_unavailable_reads_like_the_log_line() {
        let err = DispatchError::payload_unavailable(
            DispatchContext {
                backend_id: "m-1".into(),
                ..Default::default()
            },
            "message body is empty",
        );

        assert_eq!(err.kind, DispatchErrorKind::PayloadUnavailable);
        assert_eq!(err.to_string(), "payload is not available");
        assert_eq!(err.cause().as_deref(), Some("message body is empty"));
    }

    #[test]
    fn handler_failed_keeps_the_handler_error_as_source() {
        let err = DispatchError::handler_failed(
            DispatchContext::default(),
            HandlerError::new("boom"),
        );

        assert_eq!(err.kind, DispatchErrorKind::HandlerFailed);
        assert_eq!(err.source().map(|e| e.to_string()).as_deref(), Some("boom"));
    }

    #[test]
    fn handler_error_chains_source() {
        let io = std::io::Error::other("disk full");
        let err = HandlerError::with_source("could not persist", io);

        assert_eq!(err.message(), "could not persist");
        assert_eq!(err.source().map(|e| e.to_string()).as_deref(), Some("disk full"));
    }

    #[test]
    fn kind_serializes_in_snake_case() {
        let json = serde_json::to_string(&DispatchErrorKind::PayloadUnavailable).unwrap();
        assert_eq!(json, "\"payload_unavailable\"");
    }
}
