//! Per-resource sync state.

use kvbridge_protocol::{ChangeTimestamp, ResourceKind};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Push progress of one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushState {
    /// Nothing to send.
    Idle,
    /// A push is armed and waiting out the debounce delay.
    Debouncing,
    /// A push is on the wire.
    InFlight,
    /// A rejected push is being resolved by adopting the server value.
    Reconciling,
}

impl PushState {
    /// Returns true if local edits have not reached the server yet.
    pub fn is_pending(&self) -> bool {
        matches!(self, PushState::Debouncing | PushState::InFlight)
    }
}

/// Counters describing bridge activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeStats {
    /// Pushes sent to the remote store.
    pub pushes_sent: u64,
    /// Pushes the remote store accepted.
    pub pushes_accepted: u64,
    /// Rejected pushes resolved by adopting the server value.
    pub pushes_adopted: u64,
    /// Pushes that failed (network or validation).
    pub pushes_failed: u64,
    /// Armed pushes replaced by a later edit before firing.
    pub pushes_coalesced: u64,
    /// Pulls whose remote value was written locally.
    pub pulls_applied: u64,
    /// Pulls whose remote value matched the local one.
    pub pulls_unchanged: u64,
    /// Pulls discarded by an edit lock, pending push, or dirty window.
    pub pulls_skipped: u64,
    /// Pulls that failed.
    pub pulls_failed: u64,
}

/// An armed debounce timer.
#[derive(Debug)]
pub(crate) struct PendingPush {
    pub(crate) generation: u64,
    pub(crate) timer: JoinHandle<()>,
}

/// Sync bookkeeping of one resource.
#[derive(Debug, Default)]
pub(crate) struct ResourceState {
    /// Time of the last local edit, raised by every adopted remote token.
    pub(crate) local_token: ChangeTimestamp,
    /// Highest token seen from the remote store.
    pub(crate) last_remote_token: Option<ChangeTimestamp>,
    pub(crate) edit_lock_until: Option<Instant>,
    pub(crate) dirty_until: Option<Instant>,
    /// Bumped by every local edit.
    pub(crate) generation: u64,
    pub(crate) pending: Option<PendingPush>,
    pub(crate) in_flight: u32,
    pub(crate) reconciling: bool,
    pub(crate) pull_in_flight: bool,
}

impl ResourceState {
    pub(crate) fn push_state(&self) -> PushState {
        if self.reconciling {
            PushState::Reconciling
        } else if self.in_flight > 0 {
            PushState::InFlight
        } else if self.pending.is_some() {
            PushState::Debouncing
        } else {
            PushState::Idle
        }
    }

    pub(crate) fn is_edit_locked(&self, now: Instant) -> bool {
        self.edit_lock_until.is_some_and(|until| now < until)
    }

    pub(crate) fn is_dirty(&self, now: Instant) -> bool {
        self.dirty_until.is_some_and(|until| now < until)
    }

    /// Returns true if `token` is older than what the remote store already
    /// reported for this resource.
    pub(crate) fn is_stale(&self, token: Option<ChangeTimestamp>) -> bool {
        matches!((token, self.last_remote_token), (Some(t), Some(seen)) if t < seen)
    }

    pub(crate) fn has_unsent_push(&self) -> bool {
        self.pending.is_some() || self.in_flight > 0
    }

    pub(crate) fn adopt_token(&mut self, token: ChangeTimestamp) {
        self.local_token = self.local_token.max(token);
        self.last_remote_token = self.last_remote_token.max(Some(token));
    }
}

/// All mutable bridge state, guarded by one mutex.
#[derive(Debug, Default)]
pub(crate) struct SyncState {
    resources: [ResourceState; ResourceKind::COUNT],
    pub(crate) stats: BridgeStats,
}

impl SyncState {
    pub(crate) fn resource(&self, kind: ResourceKind) -> &ResourceState {
        &self.resources[kind.index()]
    }

    pub(crate) fn resource_mut(&mut self, kind: ResourceKind) -> &mut ResourceState {
        &mut self.resources[kind.index()]
    }
}
