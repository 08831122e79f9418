//! Main remote store server.

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::handler::{HandlerContext, RequestHandler};
use crate::store::ResourceStore;
use kvbridge_protocol::{ChangeTimestamp, Clock, PutOutcome, ResourceKind, Snapshot, SystemClock};
use serde_json::Value;
use std::sync::Arc;

/// The remote store.
///
/// Holds one value and one change timestamp per resource and applies the
/// optimistic-concurrency rule to every write.
///
/// # Example
///
/// ```
/// use kvbridge_server::{ServerConfig, SyncServer};
/// use kvbridge_protocol::ResourceKind;
///
/// let server = SyncServer::new(ServerConfig::default());
/// let snapshot = server.handle_get(ResourceKind::Orders);
/// assert!(snapshot.value.is_empty());
/// ```
pub struct SyncServer {
    handler: RequestHandler,
    context: Arc<HandlerContext>,
}

impl SyncServer {
    /// Creates a new server with empty storage and the system clock.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_store(config, Arc::new(ResourceStore::new()))
    }

    /// Creates a server over existing storage.
    pub fn with_store(config: ServerConfig, store: Arc<ResourceStore>) -> Self {
        Self::with_clock(config, store, Arc::new(SystemClock))
    }

    /// Creates a server with an explicit clock.
    pub fn with_clock(
        config: ServerConfig,
        store: Arc<ResourceStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let context = Arc::new(HandlerContext::new(config, store, clock));
        let handler = RequestHandler::new(Arc::clone(&context));

        Self { handler, context }
    }

    /// Handles a read.
    pub fn handle_get(&self, kind: ResourceKind) -> Snapshot {
        self.handler.handle_get(kind)
    }

    /// Handles a write.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is malformed.
    pub fn handle_put(
        &self,
        kind: ResourceKind,
        body: &Value,
        token: Option<ChangeTimestamp>,
    ) -> ServerResult<PutOutcome> {
        self.handler.handle_put(kind, body, token)
    }

    /// Returns the stored token of a resource.
    pub fn token(&self, kind: ResourceKind) -> ChangeTimestamp {
        self.context.store.token(kind)
    }

    /// Returns the underlying storage.
    pub fn store(&self) -> &Arc<ResourceStore> {
        &self.context.store
    }

    /// Returns the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.context.config
    }
}
