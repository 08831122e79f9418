//! Request handlers for the resource endpoints.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::store::ResourceStore;
use kvbridge_protocol::{ChangeTimestamp, Clock, PutOutcome, ResourceKind, ResourceValue, Snapshot};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Context for request handling.
pub struct HandlerContext {
    /// Server configuration.
    pub config: ServerConfig,
    /// Resource storage (shared across all handlers).
    pub store: Arc<ResourceStore>,
    /// Clock used to stamp accepted writes.
    pub clock: Arc<dyn Clock>,
}

impl HandlerContext {
    /// Creates a new handler context.
    pub fn new(config: ServerConfig, store: Arc<ResourceStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            store,
            clock,
        }
    }
}

/// Handler for resource requests.
pub struct RequestHandler {
    context: Arc<HandlerContext>,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }

    /// Handles a read.
    pub fn handle_get(&self, kind: ResourceKind) -> Snapshot {
        self.context.store.snapshot(kind)
    }

    /// Handles a write.
    ///
    /// A stale token is not an error: it yields [`PutOutcome::Conflict`]
    /// carrying the stored state.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::InvalidRequest`] if the body fails validation.
    pub fn handle_put(
        &self,
        kind: ResourceKind,
        body: &Value,
        token: Option<ChangeTimestamp>,
    ) -> ServerResult<PutOutcome> {
        let value = ResourceValue::validate_wire(kind, body)?;
        let now = self.context.clock.now();

        match self
            .context
            .store
            .write(value, token, now, self.context.config.enforce_tokens)
        {
            Ok(new_token) => {
                info!(resource = %kind, token = %new_token, "write accepted");
                Ok(PutOutcome::Accepted { token: new_token })
            }
            Err(ServerError::StaleWrite { stored, client }) => {
                debug!(resource = %kind, %stored, %client, "stale write rejected");
                Ok(PutOutcome::Conflict(self.context.store.snapshot(kind)))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvbridge_protocol::ManualClock;
    use serde_json::json;

    fn create_handler(clock_millis: u64) -> (RequestHandler, Arc<ResourceStore>) {
        let store = Arc::new(ResourceStore::new());
        let context = Arc::new(HandlerContext::new(
            ServerConfig::default(),
            Arc::clone(&store),
            Arc::new(ManualClock::new(clock_millis)),
        ));
        (RequestHandler::new(context), store)
    }

    #[test]
    fn get_empty() {
        let (handler, _) = create_handler(0);
        let snapshot = handler.handle_get(ResourceKind::Catalog);
        assert_eq!(
            snapshot.value.to_wire(),
            json!({"products": [], "cats": []})
        );
    }

    #[test]
    fn put_and_get() {
        let (handler, _) = create_handler(1_000);
        let outcome = handler
            .handle_put(
                ResourceKind::Orders,
                &json!({"orders": [{"id": 1}]}),
                Some(ChangeTimestamp::from_millis(900)),
            )
            .unwrap();
        assert_eq!(
            outcome,
            PutOutcome::Accepted {
                token: ChangeTimestamp::from_millis(1_000)
            }
        );

        let snapshot = handler.handle_get(ResourceKind::Orders);
        assert_eq!(snapshot.value.to_wire(), json!({"orders": [{"id": 1}]}));
        assert_eq!(snapshot.token, Some(ChangeTimestamp::from_millis(1_000)));
    }

    #[test]
    fn put_rejects_non_array_body() {
        let (handler, store) = create_handler(0);
        let err = handler
            .handle_put(ResourceKind::Bank, &json!({"log": {"a": 1}}), None)
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(store.write_count(ResourceKind::Bank), 0);
    }

    #[test]
    fn stale_put_returns_server_state() {
        let (handler, store) = create_handler(0);
        let current = ResourceValue::Catalog {
            products: vec![json!({"id": 9, "category": "hats"})],
            cats: vec![json!("hats")],
        };
        store.seed(current.clone(), ChangeTimestamp::from_millis(100));

        let outcome = handler
            .handle_put(
                ResourceKind::Catalog,
                &json!({"products": [], "cats": []}),
                Some(ChangeTimestamp::from_millis(50)),
            )
            .unwrap();

        match outcome {
            PutOutcome::Conflict(snapshot) => {
                assert_eq!(snapshot.value, current);
                assert_eq!(snapshot.token, Some(ChangeTimestamp::from_millis(100)));
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    // Token enforcement is uniform: the non-catalog resources reject stale
    // writes exactly like the catalog does.
    #[test]
    fn every_resource_enforces_tokens() {
        let (handler, store) = create_handler(0);
        for kind in ResourceKind::ALL {
            store.seed(ResourceValue::empty(kind), ChangeTimestamp::from_millis(100));
            let outcome = handler
                .handle_put(
                    kind,
                    &ResourceValue::empty(kind).to_wire(),
                    Some(ChangeTimestamp::from_millis(99)),
                )
                .unwrap();
            assert!(!outcome.is_accepted(), "{kind} accepted a stale write");
        }
    }
}
