//! RelayBuilder - 設定・handler・バックエンドを組み立てて PollLoop を作る
//!
//! # 起動時検証
//! - バックエンドが無ければ BuildError::MissingBackend
//! - routes が Catalog に無い handler を指していたら warn を出す
//! - `require_resolvable_routes()` を付けた場合はそれを BuildError にする（fail-fast）

use std::collections::HashMap;
use std::sync::Arc;

use crate::app::dispatcher::Dispatcher;
use crate::app::poll_loop::PollLoop;
use crate::app::registry::{HandlerCatalog, HandlerRegistry, RegistryError};
use crate::config::RelayConfig;
use crate::domain::FactoryError;
use crate::impls::TracingEventSink;
use crate::ports::{
    Clock, EventSink, IdGenerator, MessageHandler, QueueBackend, SystemClock, UlidGenerator,
};

/// BuildError は PollLoop 構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no queue backend configured")]
    MissingBackend,

    #[error("Routes point at unregistered handlers: {0:?}")]
    UnresolvableRoutes(Vec<String>),
}

/// # 使用例
/// ```ignore
/// let poll_loop = RelayBuilder::from_config(&config)
///     .register("orders", OrdersHandler::new(db))?
///     .backend(Arc::new(SqsQueueBackend::from_env(&config.queue).await))
///     .build()?;
/// let stats = poll_loop.run().await?;
/// ```
pub struct RelayBuilder {
    routes: HashMap<String, String>,
    catalog: HandlerCatalog,
    backend: Option<Arc<dyn QueueBackend>>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    ids: Option<Arc<dyn IdGenerator>>,
    require_resolvable: bool,
}

impl RelayBuilder {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            catalog: HandlerCatalog::new(),
            backend: None,
            events: Arc::new(TracingEventSink),
            clock: Arc::new(SystemClock),
            ids: None,
            require_resolvable: false,
        }
    }

    /// Start from the routes of a loaded config.
    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new().routes(config.routes.clone())
    }

    pub fn routes(mut self, routes: HashMap<String, String>) -> Self {
        self.routes = routes;
        self
    }

    pub fn route(mut self, routing_key: impl Into<String>, handler: impl Into<String>) -> Self {
        self.routes.insert(routing_key.into(), handler.into());
        self
    }

    pub fn catalog(mut self, catalog: HandlerCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn register<H: MessageHandler + 'static>(
        mut self,
        identifier: impl Into<String>,
        handler: H,
    ) -> Result<Self, RegistryError> {
        self.catalog.register(identifier, handler)?;
        Ok(self)
    }

    pub fn register_factory<F>(
        mut self,
        identifier: impl Into<String>,
        factory: F,
    ) -> Result<Self, RegistryError>
    where
        F: Fn() -> Result<Arc<dyn MessageHandler>, FactoryError> + Send + Sync + 'static,
    {
        self.catalog.register_factory(identifier, factory)?;
        Ok(self)
    }

    pub fn backend(mut self, backend: Arc<dyn QueueBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Fail the build when a route names a handler the catalog lacks.
    pub fn require_resolvable_routes(mut self) -> Self {
        self.require_resolvable = true;
        self
    }

    pub fn build(self) -> Result<PollLoop, BuildError> {
        let backend = self.backend.ok_or(BuildError::MissingBackend)?;
        let registry = HandlerRegistry::new(self.routes, self.catalog);

        let unresolvable = registry.unresolvable_routes();
        for (routing_key, handler) in &unresolvable {
            tracing::warn!(
                routing_key = %routing_key,
                handler = %handler,
                "route points at an unregistered handler; its messages will be acknowledged unhandled"
            );
        }
        if self.require_resolvable && !unresolvable.is_empty() {
            return Err(BuildError::UnresolvableRoutes(
                unresolvable.into_iter().map(|(key, _)| key).collect(),
            ));
        }

        let ids: Arc<dyn IdGenerator> = match self.ids {
            Some(ids) => ids,
            None => Arc::new(UlidGenerator::new(Arc::clone(&self.clock))),
        };
        Ok(PollLoop::new(
            backend,
            Dispatcher::new(registry, Arc::clone(&self.events)),
            self.events,
            self.clock,
            ids,
        ))
    }
}

impl Default for RelayBuilder {
    fn default() -> Self {
        Self::new()
    }
}
