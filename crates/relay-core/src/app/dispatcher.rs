//! Dispatcher - 1 メッセージの parse → resolve → handle → ack 登録
//!
//! # フロー
//! 1. `Envelope::parse` で本文を解析（失敗 → PayloadUnavailable、ack しない）
//! 2. routing key で handler を resolve
//! 3. handler があれば実行（失敗 → HandlerFailed、ack しない）
//! 4. 成功（handler 無しも含む）なら AckBuffer に `{id, delete_token}` を積む
//!
//! 「handler が無い」と「handler が失敗した」は区別します。
//! 無いものは今後も見つからないので消す。失敗したものは再配送に残す。

use std::sync::Arc;

use crate::app::ack_buffer::AckBuffer;
use crate::app::registry::HandlerRegistry;
use crate::domain::{DispatchContext, DispatchError, Envelope, RawMessage, RelayEvent, RunId};
use crate::ports::EventSink;

/// How a successfully dispatched message was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// A handler ran and returned `Ok`.
    Handled { handler: String },
    /// No handler matched; the message is acknowledged without action.
    Unroutable,
}

pub struct Dispatcher {
    registry: HandlerRegistry,
    events: Arc<dyn EventSink>,
}

impl Dispatcher {
    pub fn new(registry: HandlerRegistry, events: Arc<dyn EventSink>) -> Self {
        Self { registry, events }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Process one message, queueing its acknowledgement on success.
    pub async fn process(
        &self,
        run_id: RunId,
        raw: &RawMessage,
        acks: &mut AckBuffer,
    ) -> Result<Dispatch, DispatchError> {
        let mut context = DispatchContext {
            backend_id: raw.id().to_string(),
            receive_count: raw.receive_count(),
            ..Default::default()
        };

        let envelope = Envelope::parse(raw)
            .map_err(|failure| DispatchError::payload_unavailable(context.clone(), failure))?;
        context.message_id = Some(envelope.message_id().to_string());
        context.routing_key = envelope.routing_key().map(str::to_string);

        let outcome = match self.registry.resolve(envelope.routing_key()) {
            None => {
                tracing::debug!(
                    message_id = envelope.message_id(),
                    routing_key = envelope.routing_key(),
                    "no handler for message, acknowledging"
                );
                Dispatch::Unroutable
            }
            Some(resolved) => {
                self.events.emit(&RelayEvent::HandlerInvoked {
                    run_id,
                    message_id: envelope.message_id().to_string(),
                    routing_key: envelope.routing_key().unwrap_or_default().to_string(),
                    handler: resolved.identifier().to_string(),
                });
                if let Err(err) = resolved.handler().handle(raw).await {
                    context.handler = Some(resolved.identifier().to_string());
                    return Err(DispatchError::handler_failed(context, err));
                }
                Dispatch::Handled {
                    handler: resolved.identifier().to_string(),
                }
            }
        };

        acks.push(raw.ack_entry());
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::registry::HandlerCatalog;
    use crate::domain::{AckEntry, DispatchErrorKind, HandlerError};
    use crate::impls::MemoryEventSink;
    use crate::ports::MessageHandler;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use ulid::Ulid;

    #[derive(Default)]
    struct CountingHandler {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MessageHandler for CountingHandler {
        async fn handle(&self, _message: &RawMessage) -> Result<(), HandlerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl MessageHandler for FailingHandler {
        async fn handle(&self, _message: &RawMessage) -> Result<(), HandlerError> {
            Err(HandlerError::new("downstream unavailable"))
        }
    }

    struct Fixture {
        dispatcher: Dispatcher,
        counting: Arc<CountingHandler>,
        events: Arc<MemoryEventSink>,
    }

    fn fixture() -> Fixture {
        let counting = Arc::new(CountingHandler::default());
        let mut catalog = HandlerCatalog::new();
        catalog
            .register_shared("counting", counting.clone() as Arc<dyn MessageHandler>)
            .unwrap();
        catalog.register("failing", FailingHandler).unwrap();
        let routes = HashMap::from([
            ("topic-A".to_string(), "counting".to_string()),
            ("topic-F".to_string(), "failing".to_string()),
            ("topic-X".to_string(), "not-registered".to_string()),
        ]);
        let events = Arc::new(MemoryEventSink::new());
        let dispatcher = Dispatcher::new(HandlerRegistry::new(routes, catalog), events.clone());
        Fixture {
            dispatcher,
            counting,
            events,
        }
    }

    fn notification(id: &str, topic: Option<&str>) -> RawMessage {
        let mut record = json!({ "Type": "Notification", "MessageId": format!("sns-{id}"), "Message": "hi" });
        if let Some(topic) = topic {
            record["TopicArn"] = json!(topic);
        }
        RawMessage::new(id, format!("receipt-{id}"), Some(record.to_string()))
    }

    fn run_id() -> RunId {
        RunId::from_ulid(Ulid::new())
    }

    #[tokio::test]
    async fn routed_message_is_handled_and_queued_for_ack() {
        let f = fixture();
        let mut acks = AckBuffer::new();

        let outcome = f
            .dispatcher
            .process(run_id(), &notification("m-1", Some("topic-A")), &mut acks)
            .await
            .unwrap();

        assert_eq!(outcome, Dispatch::Handled { handler: "counting".into() });
        assert_eq!(f.counting.calls.load(Ordering::SeqCst), 1);
        assert_eq!(acks.entries(), &[AckEntry::new("m-1", "receipt-m-1")]);
        assert_eq!(f.events.names(), vec!["handler-invoked"]);
    }

    #[tokio::test]
    async fn unmapped_routing_key_is_acknowledged_without_invocation() {
        let f = fixture();
        let mut acks = AckBuffer::new();

        let outcome = f
            .dispatcher
            .process(run_id(), &notification("m-1", Some("topic-Z")), &mut acks)
            .await
            .unwrap();

        assert_eq!(outcome, Dispatch::Unroutable);
        assert_eq!(f.counting.calls.load(Ordering::SeqCst), 0);
        assert_eq!(acks.len(), 1);
        assert!(f.events.events().is_empty());
    }

    #[tokio::test]
    async fn missing_routing_key_is_acknowledged() {
        let f = fixture();
        let mut acks = AckBuffer::new();

        let outcome = f
            .dispatcher
            .process(run_id(), &notification("m-1", None), &mut acks)
            .await
            .unwrap();

        assert_eq!(outcome, Dispatch::Unroutable);
        assert_eq!(acks.len(), 1);
    }

    #[tokio::test]
    async fn unresolvable_handler_is_acknowledged_without_invocation() {
        let f = fixture();
        let mut acks = AckBuffer::new();

        let outcome = f
            .dispatcher
            .process(run_id(), &notification("m-1", Some("topic-X")), &mut acks)
            .await
            .unwrap();

        assert_eq!(outcome, Dispatch::Unroutable);
        assert_eq!(acks.len(), 1);
    }

    #[tokio::test]
    async fn empty_body_is_payload_unavailable_and_not_acked() {
        let f = fixture();
        let mut acks = AckBuffer::new();
        let raw = RawMessage::new("m-1", "receipt-m-1", Some(String::new())).with_receive_count(4);

        let err = f.dispatcher.process(run_id(), &raw, &mut acks).await.unwrap_err();

        assert_eq!(err.kind, DispatchErrorKind::PayloadUnavailable);
        assert_eq!(err.context.backend_id, "m-1");
        assert_eq!(err.context.message_id, None);
        assert_eq!(err.context.receive_count, Some(4));
        assert!(acks.is_empty());
    }

    #[tokio::test]
    async fn handler_failure_is_reported_and_not_acked() {
        let f = fixture();
        let mut acks = AckBuffer::new();

        let err = f
            .dispatcher
            .process(run_id(), &notification("m-1", Some("topic-F")), &mut acks)
            .await
            .unwrap_err();

        assert_eq!(err.kind, DispatchErrorKind::HandlerFailed);
        assert_eq!(err.context.message_id.as_deref(), Some("sns-m-1"));
        assert_eq!(err.context.routing_key.as_deref(), Some("topic-F"));
        assert_eq!(err.context.handler.as_deref(), Some("failing"));
        assert_eq!(err.cause().as_deref(), Some("downstream unavailable"));
        assert!(acks.is_empty());
    }
}
