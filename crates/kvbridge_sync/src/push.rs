//! Debounced push scheduling.

use crate::bridge::BridgeInner;
use crate::state::{PendingPush, SyncState};
use kvbridge_protocol::{ChangeTimestamp, ResourceKind, ResourceValue};
use kvbridge_storage::StorageResult;
use serde_json::Value;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, warn};

/// How a push ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// The remote store stored the value under `token`.
    Accepted {
        /// Token assigned by the remote store.
        token: ChangeTimestamp,
    },
    /// The push was rejected and the server value replaced the local one.
    Adopted {
        /// The server's token, now also the local one.
        token: ChangeTimestamp,
    },
    /// The push was rejected but a newer local edit is pending; only the
    /// server token was adopted.
    Superseded {
        /// The server's token.
        token: ChangeTimestamp,
    },
    /// The push failed and was dropped.
    Failed(String),
}

/// A push about to go on the wire.
pub(crate) struct PreparedPush {
    pub(crate) kind: ResourceKind,
    pub(crate) value: ResourceValue,
    pub(crate) token: ChangeTimestamp,
    /// Edit generation the value was read at.
    pub(crate) generation: u64,
}

/// Collects the distinct values of `field` across `items`, in first-seen
/// order. Items lacking the field, or holding `null`, are skipped.
pub fn derive_labels(items: &[Value], field: &str) -> Vec<Value> {
    let mut labels: Vec<Value> = Vec::new();
    for label in items.iter().filter_map(|item| item.get(field)) {
        if !label.is_null() && !labels.contains(label) {
            labels.push(label.clone());
        }
    }
    labels
}

impl BridgeInner {
    /// Arms the debounce timer of `kind` after a local edit.
    pub(crate) fn arm_push(self: &Arc<Self>, state: &mut SyncState, kind: ResourceKind) {
        let _runtime = self.runtime.enter();
        let now = Instant::now();
        let stamp = self.clock.now();

        let resource = state.resource_mut(kind);
        let replaced = resource.pending.take();
        if let Some(previous) = &replaced {
            previous.timer.abort();
        }
        resource.edit_lock_until = Some(now + self.config.edit_lock);
        resource.dirty_until = Some(now + self.config.dirty_window);
        resource.local_token = resource.local_token.max(stamp);
        resource.generation += 1;

        let generation = resource.generation;
        let debounce = self.config.debounce;
        let inner = Arc::clone(self);
        let timer = self.runtime.spawn(async move {
            tokio::time::sleep(debounce).await;
            inner.fire_push(kind, generation).await;
        });
        resource.pending = Some(PendingPush { generation, timer });

        if replaced.is_some() {
            state.stats.pushes_coalesced += 1;
            debug!(resource = %kind, generation, "push coalesced");
        }
    }

    /// Timer callback. Sends the push armed at `generation` unless it has
    /// been replaced or flushed since.
    async fn fire_push(self: &Arc<Self>, kind: ResourceKind, generation: u64) {
        let prepared = {
            let mut state = self.state.lock();
            let resource = state.resource_mut(kind);
            if resource.pending.as_ref().map(|p| p.generation) != Some(generation) {
                return;
            }
            resource.pending = None;
            self.prepare_push(&mut state, kind)
        };
        self.dispatch(kind, prepared).await;
    }

    pub(crate) async fn flush(self: &Arc<Self>, kind: ResourceKind) -> Option<PushOutcome> {
        let prepared = {
            let mut state = self.state.lock();
            let pending = state.resource_mut(kind).pending.take()?;
            pending.timer.abort();
            self.prepare_push(&mut state, kind)
        };
        Some(self.dispatch(kind, prepared).await)
    }

    /// Reads the value to send and marks the push in flight.
    ///
    /// For the catalog the labels are recomputed from the items and written
    /// back to the labels key first.
    fn prepare_push(
        &self,
        state: &mut SyncState,
        kind: ResourceKind,
    ) -> StorageResult<PreparedPush> {
        let mut value = self.mirror.read_canonical(kind)?;
        if let ResourceValue::Catalog { products, cats } = &mut value {
            *cats = derive_labels(products, &self.config.label_field);
            self.mirror.write_labels(cats)?;
        }

        let resource = state.resource_mut(kind);
        resource.in_flight += 1;
        let prepared = PreparedPush {
            kind,
            value,
            token: resource.local_token,
            generation: resource.generation,
        };
        state.stats.pushes_sent += 1;
        Ok(prepared)
    }

    async fn dispatch(
        self: &Arc<Self>,
        kind: ResourceKind,
        prepared: StorageResult<PreparedPush>,
    ) -> PushOutcome {
        let prepared = match prepared {
            Ok(prepared) => prepared,
            Err(e) => {
                warn!(resource = %kind, error = %e, "push dropped: local read failed");
                self.state.lock().stats.pushes_failed += 1;
                return PushOutcome::Failed(e.to_string());
            }
        };

        debug!(resource = %kind, token = %prepared.token, "pushing");
        let result = self
            .remote
            .put(kind, &prepared.value, prepared.token)
            .await;

        let mut state = self.state.lock();
        let resource = state.resource_mut(kind);
        resource.in_flight = resource.in_flight.saturating_sub(1);
        self.resolve_push(&mut state, prepared, result)
    }
}
