//! MessageHandler port - handler の能力契約
//!
//! 「RawMessage を 1 件受け取り、何も返さず、失敗しうる」だけが契約です。
//! この trait を実装していること自体が capability check になります
//! （`HandlerCatalog` は `dyn MessageHandler` しか登録できない）。

use async_trait::async_trait;

use crate::domain::{HandlerError, RawMessage};

/// A unit that processes one routed message.
///
/// # 使用例
/// ```ignore
/// struct AuditHandler;
///
/// #[async_trait]
/// impl MessageHandler for AuditHandler {
///     async fn handle(&self, message: &RawMessage) -> Result<(), HandlerError> {
///         audit::record(message.body().unwrap_or_default()).await
///             .map_err(|e| HandlerError::with_source("audit write failed", e))
///     }
/// }
/// ```
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: &RawMessage) -> Result<(), HandlerError>;
}
