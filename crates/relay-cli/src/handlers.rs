//! Built-in handler units selectable from `[routes]`.
//!
//! - `log`: logs the envelope metadata and payload
//! - `stdout`: writes the envelope as one JSON line to stdout

use std::io::Write;

use async_trait::async_trait;
use relay_core::app::{HandlerCatalog, RegistryError};
use relay_core::domain::{Envelope, HandlerError, RawMessage};
use relay_core::ports::MessageHandler;

pub const LOG_HANDLER: &str = "log";
pub const STDOUT_HANDLER: &str = "stdout";

fn envelope(message: &RawMessage) -> Result<Envelope, HandlerError> {
    Envelope::parse(message).map_err(|e| HandlerError::with_source("envelope not decodable", e))
}

pub struct LogHandler;

#[async_trait]
impl MessageHandler for LogHandler {
    async fn handle(&self, message: &RawMessage) -> Result<(), HandlerError> {
        let envelope = envelope(message)?;
        tracing::info!(
            message_id = envelope.message_id(),
            routing_key = envelope.routing_key(),
            subject = envelope.subject(),
            receive_count = message.receive_count(),
            payload = %envelope.payload(),
            "received notification"
        );
        Ok(())
    }
}

pub struct StdoutHandler;

impl StdoutHandler {
    fn render(message: &RawMessage) -> Result<String, HandlerError> {
        let envelope = envelope(message)?;
        serde_json::to_string(&envelope)
            .map_err(|e| HandlerError::with_source("envelope not serializable", e))
    }
}

#[async_trait]
impl MessageHandler for StdoutHandler {
    async fn handle(&self, message: &RawMessage) -> Result<(), HandlerError> {
        let line = Self::render(message)?;
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{line}")
            .and_then(|()| stdout.flush())
            .map_err(|e| HandlerError::with_source("stdout write failed", e))
    }
}

pub fn builtin_catalog() -> Result<HandlerCatalog, RegistryError> {
    let mut catalog = HandlerCatalog::new();
    catalog.register(LOG_HANDLER, LogHandler)?;
    catalog.register(STDOUT_HANDLER, StdoutHandler)?;
    Ok(catalog)
}
