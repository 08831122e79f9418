//! Resolution of push results.
//!
//! A rejected push means another writer got to the server first. The server
//! value wins unless the host has edited the resource again since the push
//! was read, in which case the newer edit goes out with the adopted token.

use crate::bridge::BridgeInner;
use crate::error::SyncResult;
use crate::push::{PreparedPush, PushOutcome};
use crate::state::SyncState;
use kvbridge_protocol::{PutOutcome, Snapshot};
use tracing::{debug, info, warn};

impl BridgeInner {
    pub(crate) fn resolve_push(
        &self,
        state: &mut SyncState,
        push: PreparedPush,
        result: SyncResult<PutOutcome>,
    ) -> PushOutcome {
        let kind = push.kind;
        match result {
            Ok(PutOutcome::Accepted { token }) => {
                state.resource_mut(kind).adopt_token(token);
                state.stats.pushes_accepted += 1;
                debug!(resource = %kind, %token, "push accepted");
                PushOutcome::Accepted { token }
            }
            Ok(PutOutcome::Conflict(snapshot)) => self.reconcile(state, &push, snapshot),
            Err(e) => {
                state.stats.pushes_failed += 1;
                warn!(resource = %kind, error = %e, retryable = e.is_retryable(), "push failed");
                PushOutcome::Failed(e.to_string())
            }
        }
    }

    fn reconcile(
        &self,
        state: &mut SyncState,
        push: &PreparedPush,
        server: Snapshot,
    ) -> PushOutcome {
        let kind = push.kind;
        let token = server.token.unwrap_or_default();
        let resource = state.resource_mut(kind);
        resource.reconciling = true;

        let outcome = if resource.generation == push.generation {
            match self
                .mirror
                .write_canonical(&server.value)
                .and_then(|()| self.mirror.fan_out(kind))
            {
                Ok(_) => {
                    info!(resource = %kind, %token, "push rejected, adopted server value");
                    PushOutcome::Adopted { token }
                }
                Err(e) => {
                    warn!(resource = %kind, error = %e, "failed to adopt server value");
                    PushOutcome::Failed(e.to_string())
                }
            }
        } else {
            debug!(resource = %kind, %token, "push rejected, newer local edit pending");
            PushOutcome::Superseded { token }
        };

        let resource = state.resource_mut(kind);
        if let Some(server_token) = server.token {
            resource.adopt_token(server_token);
        }
        resource.reconciling = false;

        match outcome {
            PushOutcome::Adopted { .. } => state.stats.pushes_adopted += 1,
            PushOutcome::Failed(_) => state.stats.pushes_failed += 1,
            _ => {}
        }
        outcome
    }
}
