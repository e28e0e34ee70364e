//! HandlerRegistry - routing key から handler を引く
//!
//! 二段構成です：
//! - **HandlerCatalog**: handler 識別子 → 実体（共有インスタンス or factory）。
//!   ホスト側が起動時に登録する。
//! - **HandlerRegistry**: routing key → handler 識別子（設定から読み込む）+ Catalog。
//!   run 中は不変。
//!
//! # resolve の手順（どこで失敗しても None、panic も Err もしない）
//! 1. routing key が無い → None
//! 2. routes に無い → None
//! 3. 識別子が Catalog に無い、または factory が構築に失敗 → None
//! 4. capability は `dyn MessageHandler` でしか登録できないので型で保証済み
//! 5. 共有インスタンスを返すか、factory で生成して返す

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::domain::FactoryError;
use crate::ports::MessageHandler;

type FactoryFn = dyn Fn() -> Result<Arc<dyn MessageHandler>, FactoryError> + Send + Sync;

/// RegistryError は Catalog への登録エラー
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Handler '{0}' is already registered")]
    AlreadyRegistered(String),
}

#[derive(Clone)]
enum Unit {
    Shared(Arc<dyn MessageHandler>),
    Factory(Arc<FactoryFn>),
}

/// Handler identifier → constructible unit.
#[derive(Clone, Default)]
pub struct HandlerCatalog {
    units: HashMap<String, Unit>,
}

impl HandlerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler value shared by every resolution.
    pub fn register<H: MessageHandler + 'static>(
        &mut self,
        identifier: impl Into<String>,
        handler: H,
    ) -> Result<(), RegistryError> {
        self.register_shared(identifier, Arc::new(handler))
    }

    pub fn register_shared(
        &mut self,
        identifier: impl Into<String>,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(), RegistryError> {
        self.insert(identifier.into(), Unit::Shared(handler))
    }

    /// Register a factory invoked on every resolution.
    pub fn register_factory<F>(
        &mut self,
        identifier: impl Into<String>,
        factory: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn() -> Result<Arc<dyn MessageHandler>, FactoryError> + Send + Sync + 'static,
    {
        self.insert(identifier.into(), Unit::Factory(Arc::new(factory)))
    }

    fn insert(&mut self, identifier: String, unit: Unit) -> Result<(), RegistryError> {
        if self.units.contains_key(&identifier) {
            return Err(RegistryError::AlreadyRegistered(identifier));
        }
        self.units.insert(identifier, unit);
        Ok(())
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.units.contains_key(identifier)
    }

    /// Registered identifiers, sorted.
    pub fn identifiers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.units.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// `None` when the identifier is unknown.
    fn instantiate(
        &self,
        identifier: &str,
    ) -> Option<Result<Arc<dyn MessageHandler>, FactoryError>> {
        let unit = self.units.get(identifier)?;
        Some(match unit {
            Unit::Shared(handler) => Ok(Arc::clone(handler)),
            Unit::Factory(factory) => factory(),
        })
    }
}

impl fmt::Debug for HandlerCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerCatalog")
            .field("identifiers", &self.identifiers())
            .finish()
    }
}

/// A handler chosen for one message, with the identifier it was registered under.
#[derive(Clone)]
pub struct ResolvedHandler {
    identifier: String,
    handler: Arc<dyn MessageHandler>,
}

impl ResolvedHandler {
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn handler(&self) -> &dyn MessageHandler {
        self.handler.as_ref()
    }
}

impl fmt::Debug for ResolvedHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedHandler")
            .field("identifier", &self.identifier)
            .finish_non_exhaustive()
    }
}

/// Routing key → handler, fixed for the duration of a run.
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    routes: HashMap<String, String>,
    catalog: HandlerCatalog,
}

impl HandlerRegistry {
    pub fn new(routes: HashMap<String, String>, catalog: HandlerCatalog) -> Self {
        Self { routes, catalog }
    }

    pub fn resolve(&self, routing_key: Option<&str>) -> Option<ResolvedHandler> {
        let routing_key = routing_key?;
        let Some(identifier) = self.routes.get(routing_key) else {
            tracing::debug!(routing_key, "no route configured");
            return None;
        };

        match self.catalog.instantiate(identifier) {
            None => {
                tracing::warn!(
                    routing_key,
                    handler = %identifier,
                    "route points at an unknown handler"
                );
                None
            }
            Some(Err(err)) => {
                tracing::warn!(routing_key, handler = %identifier, error = %err, "handler construction failed");
                None
            }
            Some(Ok(handler)) => Some(ResolvedHandler {
                identifier: identifier.clone(),
                handler,
            }),
        }
    }

    /// Configured handler identifier for `routing_key`.
    pub fn route(&self, routing_key: &str) -> Option<&str> {
        self.routes.get(routing_key).map(String::as_str)
    }

    /// All routes as `(routing_key, handler)`, sorted by routing key.
    pub fn routes(&self) -> Vec<(&str, &str)> {
        let mut routes: Vec<(&str, &str)> = self
            .routes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        routes.sort();
        routes
    }

    /// Routes whose handler identifier the catalog does not know.
    pub fn unresolvable_routes(&self) -> Vec<(String, String)> {
        self.routes()
            .into_iter()
            .filter(|(_, identifier)| !self.catalog.contains(identifier))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    pub fn catalog(&self) -> &HandlerCatalog {
        &self.catalog
    }
}
