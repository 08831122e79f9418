//! Periodic pulls from the remote store.

use crate::bridge::BridgeInner;
use crate::state::SyncState;
use kvbridge_protocol::{ResourceKind, Snapshot};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

/// How a pull ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    /// The remote value differed and was written locally.
    Applied,
    /// The remote value matched; aliases were re-synced.
    Unchanged,
    /// Discarded: the resource was edited locally moments ago.
    SkippedLocked,
    /// Discarded: a push is debouncing or in flight.
    SkippedPending,
    /// Not compared: the remote token has not moved since the last local edit.
    SkippedDirty,
    /// Discarded: the snapshot is older than a token already seen, e.g. a
    /// fetch that started before an accepted push.
    SkippedStale,
    /// Not fetched: the previous pull of this resource is still running.
    SkippedInFlight,
    /// The fetch or the local write failed.
    Failed,
}

impl PullOutcome {
    /// Returns true if the pull was discarded or not attempted.
    pub fn is_skipped(&self) -> bool {
        matches!(
            self,
            PullOutcome::SkippedLocked
                | PullOutcome::SkippedPending
                | PullOutcome::SkippedDirty
                | PullOutcome::SkippedStale
                | PullOutcome::SkippedInFlight
        )
    }
}

impl BridgeInner {
    pub(crate) async fn pull_resource(&self, kind: ResourceKind) -> PullOutcome {
        {
            let mut state = self.state.lock();
            let resource = state.resource_mut(kind);
            if resource.pull_in_flight {
                debug!(resource = %kind, "pull skipped: previous pull still running");
                state.stats.pulls_skipped += 1;
                return PullOutcome::SkippedInFlight;
            }
            resource.pull_in_flight = true;
        }

        let fetched = self.remote.get(kind).await;

        let mut state = self.state.lock();
        state.resource_mut(kind).pull_in_flight = false;
        let outcome = match fetched {
            Ok(snapshot) => self.apply_pull(&mut state, snapshot),
            Err(e) => {
                warn!(resource = %kind, error = %e, "pull failed");
                PullOutcome::Failed
            }
        };

        let stats = &mut state.stats;
        match outcome {
            PullOutcome::Applied => stats.pulls_applied += 1,
            PullOutcome::Unchanged => stats.pulls_unchanged += 1,
            PullOutcome::Failed => stats.pulls_failed += 1,
            _ => stats.pulls_skipped += 1,
        }
        outcome
    }

    /// Applies a fetched snapshot. Runs under the state lock so a concurrent
    /// host write cannot slip between the lock check and the write.
    fn apply_pull(&self, state: &mut SyncState, snapshot: Snapshot) -> PullOutcome {
        let kind = snapshot.kind();
        let now = Instant::now();
        let resource = state.resource(kind);

        if resource.is_edit_locked(now) {
            debug!(resource = %kind, "pull discarded: edit lock");
            return PullOutcome::SkippedLocked;
        }
        if resource.has_unsent_push() {
            debug!(resource = %kind, "pull discarded: push pending");
            return PullOutcome::SkippedPending;
        }
        if resource.is_stale(snapshot.token) {
            debug!(resource = %kind, token = ?snapshot.token, "pull discarded: stale snapshot");
            return PullOutcome::SkippedStale;
        }
        if resource.is_dirty(now)
            && snapshot.token.is_some()
            && snapshot.token == resource.last_remote_token
        {
            debug!(resource = %kind, "pull skipped: remote token unchanged");
            return PullOutcome::SkippedDirty;
        }

        let applied = self.mirror.read_canonical(kind).and_then(|local| {
            let changed = local.fingerprint() != snapshot.value.fingerprint();
            if changed {
                self.mirror.write_canonical(&snapshot.value)?;
            }
            self.mirror.fan_out(kind)?;
            Ok(changed)
        });

        let outcome = match applied {
            Ok(true) => {
                debug!(resource = %kind, "pull applied");
                PullOutcome::Applied
            }
            Ok(false) => PullOutcome::Unchanged,
            Err(e) => {
                warn!(resource = %kind, error = %e, "failed to apply pull");
                return PullOutcome::Failed;
            }
        };

        if let Some(token) = snapshot.token {
            state.resource_mut(kind).adopt_token(token);
        }
        outcome
    }
}

/// Handle to a running pull loop. Dropping it stops the loop.
#[derive(Debug)]
pub struct PullLoopHandle {
    task: JoinHandle<()>,
}

impl PullLoopHandle {
    pub(crate) fn spawn(inner: &Arc<BridgeInner>) -> Self {
        let period = inner.config.pull_interval.max(Duration::from_millis(1));
        let weak = Arc::downgrade(inner);
        let task = inner.runtime.spawn(run_pull_loop(weak, period));
        Self { task }
    }

    /// Stops the loop. Pulls already started run to completion.
    pub fn stop(self) {
        self.task.abort();
    }

    /// Returns true while the loop is running.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for PullLoopHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_pull_loop(bridge: Weak<BridgeInner>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        // The first tick completes immediately and acts as the initial pull
        ticker.tick().await;
        let Some(inner) = bridge.upgrade() else {
            break;
        };
        for &kind in &inner.config.resources {
            let inner = Arc::clone(&inner);
            tokio::spawn(async move {
                inner.pull_resource(kind).await;
            });
        }
    }
}
