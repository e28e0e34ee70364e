//! EventSink の実装
//!
//! - **TracingEventSink**: 既定。イベントを tracing のイベントに変換する
//! - **MemoryEventSink**: テスト用。受け取ったイベントを溜める
//! - **NoopEventSink**: 何もしない

use std::sync::{Mutex, PoisonError};

use crate::domain::RelayEvent;
use crate::ports::EventSink;

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: &RelayEvent) {
        let name = event.name();
        match event {
            RelayEvent::RunStart { run_id } => {
                tracing::info!(event = name, %run_id, "Command Start");
            }
            RelayEvent::BatchReceived { run_id, size } => {
                tracing::debug!(event = name, %run_id, size, "received batch");
            }
            RelayEvent::HandlerInvoked {
                run_id,
                message_id,
                routing_key,
                handler,
            } => {
                tracing::info!(
                    event = name,
                    %run_id,
                    message_id = %message_id,
                    routing_key = %routing_key,
                    handler = %handler,
                    "Executing handler"
                );
            }
            RelayEvent::DispatchError {
                run_id,
                kind,
                context,
                cause,
            } => {
                tracing::error!(
                    event = name,
                    %run_id,
                    %kind,
                    backend_id = %context.backend_id,
                    message_id = context.message_id.as_deref(),
                    routing_key = context.routing_key.as_deref(),
                    handler = context.handler.as_deref(),
                    receive_count = context.receive_count,
                    cause = cause.as_deref(),
                    "message dispatch failed"
                );
            }
            RelayEvent::AckFlushed { run_id, count } => {
                tracing::debug!(event = name, %run_id, count, "deleted processed messages");
            }
            RelayEvent::AckPartialFailure { run_id, failed } => {
                let ids: Vec<&str> = failed.iter().map(|f| f.id.as_str()).collect();
                tracing::warn!(
                    event = name,
                    %run_id,
                    rejected = failed.len(),
                    ids = ?ids,
                    "backend rejected part of the delete batch"
                );
            }
            RelayEvent::RunEnd {
                run_id,
                processed,
                failed,
            } => {
                tracing::info!(
                    event = name,
                    %run_id,
                    messages_processed = processed,
                    messages_failed = failed,
                    "Command End"
                );
            }
        }
    }
}

/// Collects events for later inspection.
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<RelayEvent>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RelayEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Event names in emission order.
    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(RelayEvent::name).collect()
    }
}

impl EventSink for MemoryEventSink {
    fn emit(&self, event: &RelayEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event: &RelayEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RunId;
    use ulid::Ulid;

    #[test]
    fn memory_sink_keeps_order() {
        let sink = MemoryEventSink::new();
        let run_id = RunId::from_ulid(Ulid::new());

        sink.emit(&RelayEvent::RunStart { run_id });
        sink.emit(&RelayEvent::RunEnd {
            run_id,
            processed: 0,
            failed: 0,
        });

        assert_eq!(sink.names(), vec!["run-start", "run-end"]);
    }

    #[test]
    fn tracing_sink_accepts_every_event() {
        let run_id = RunId::from_ulid(Ulid::new());
        let sink = TracingEventSink;

        sink.emit(&RelayEvent::RunStart { run_id });
        sink.emit(&RelayEvent::AckPartialFailure {
            run_id,
            failed: vec![],
        });
        NoopEventSink.emit(&RelayEvent::RunStart { run_id });
    }
}
