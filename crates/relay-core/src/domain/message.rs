//! Queue message model: what the backend hands us, and what we hand back.

use serde::{Deserialize, Serialize};

/// A message as received from the queue backend.
///
/// Owned by the backend adapter until it is handed to the dispatcher;
/// read-only from then on (no setters on purpose).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    id: String,
    delete_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    body: Option<String>,
    /// How many times the backend has delivered this message (if reported).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    receive_count: Option<u32>,
}

impl RawMessage {
    pub fn new(
        id: impl Into<String>,
        delete_token: impl Into<String>,
        body: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            delete_token: delete_token.into(),
            body,
            receive_count: None,
        }
    }

    pub fn with_receive_count(mut self, receive_count: u32) -> Self {
        self.receive_count = Some(receive_count);
        self
    }

    /// Backend-assigned identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Opaque token that acknowledges this particular receipt.
    pub fn delete_token(&self) -> &str {
        &self.delete_token
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub fn receive_count(&self) -> Option<u32> {
        self.receive_count
    }

    /// The acknowledgement for this receipt.
    pub fn ack_entry(&self) -> AckEntry {
        AckEntry {
            id: self.id.clone(),
            delete_token: self.delete_token.clone(),
        }
    }
}

/// `{id, delete_token}` pair queued for batch deletion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AckEntry {
    pub id: String,
    pub delete_token: String,
}

impl AckEntry {
    pub fn new(id: impl Into<String>, delete_token: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            delete_token: delete_token.into(),
        }
    }
}
