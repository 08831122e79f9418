//! Server-side resource storage.

use crate::error::{ServerError, ServerResult};
use kvbridge_protocol::{
    decide_write, ChangeTimestamp, ResourceKind, ResourceValue, Snapshot, WriteDecision,
};
use parking_lot::RwLock;

#[derive(Debug, Clone)]
struct StoredResource {
    value: ResourceValue,
    token: ChangeTimestamp,
    writes: u64,
}

/// In-memory store holding the authoritative value of every resource.
///
/// Each resource carries:
/// - Its current value
/// - The change timestamp of the last accepted write (zero before any write)
/// - The number of accepted writes
pub struct ResourceStore {
    slots: RwLock<[StoredResource; ResourceKind::COUNT]>,
}

impl ResourceStore {
    /// Creates a store with every resource empty.
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(std::array::from_fn(|i| StoredResource {
                value: ResourceValue::empty(ResourceKind::ALL[i]),
                token: ChangeTimestamp::ZERO,
                writes: 0,
            })),
        }
    }

    /// Replaces a resource's value and token without any checks.
    pub fn seed(&self, value: ResourceValue, token: ChangeTimestamp) {
        let mut slots = self.slots.write();
        let slot = &mut slots[value.kind().index()];
        slot.value = value;
        slot.token = token;
    }

    /// Returns the current state of a resource.
    pub fn snapshot(&self, kind: ResourceKind) -> Snapshot {
        let slots = self.slots.read();
        let slot = &slots[kind.index()];
        Snapshot::new(slot.value.clone(), Some(slot.token))
    }

    /// Returns the stored change timestamp of a resource.
    pub fn token(&self, kind: ResourceKind) -> ChangeTimestamp {
        self.slots.read()[kind.index()].token
    }

    /// Returns how many writes to a resource have been accepted.
    pub fn write_count(&self, kind: ResourceKind) -> u64 {
        self.slots.read()[kind.index()].writes
    }

    /// Applies a write under the optimistic-concurrency rule.
    ///
    /// With `enforce` unset the client token is only advisory.
    /// Returns the new stored token.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::StaleWrite`] if `enforce` is set and the client
    /// token is older than the stored one. Nothing is written in that case.
    pub fn write(
        &self,
        value: ResourceValue,
        client: Option<ChangeTimestamp>,
        now: ChangeTimestamp,
        enforce: bool,
    ) -> ServerResult<ChangeTimestamp> {
        let mut slots = self.slots.write();
        let slot = &mut slots[value.kind().index()];

        let decision = if enforce {
            decide_write(client, slot.token, now)
        } else {
            let floor = slot.token.max(client.unwrap_or_default());
            decide_write(None, floor, now)
        };

        match decision {
            WriteDecision::Accept { new_token } => {
                slot.value = value;
                slot.token = new_token;
                slot.writes += 1;
                Ok(new_token)
            }
            WriteDecision::Reject { stored } => Err(ServerError::StaleWrite {
                stored,
                client: client.unwrap_or_default(),
            }),
        }
    }
}

impl Default for ResourceStore {
    fn default() -> Self {
        Self::new()
    }
}
