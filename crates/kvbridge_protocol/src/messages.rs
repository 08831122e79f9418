//! Messages exchanged between the bridge and the remote store.

use crate::resource::ResourceKind;
use crate::token::ChangeTimestamp;
use crate::value::ResourceValue;

/// HTTP header carrying the sync token on requests and responses.
pub const SYNC_TS_HEADER: &str = "X-Sync-Ts";

/// The remote state of one resource at the time of a read.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// The remote value.
    pub value: ResourceValue,
    /// The remote change timestamp, when the store reported one.
    pub token: Option<ChangeTimestamp>,
}

impl Snapshot {
    /// Creates a snapshot.
    pub fn new(value: ResourceValue, token: Option<ChangeTimestamp>) -> Self {
        Self { value, token }
    }

    /// Returns the resource of the snapshot.
    pub fn kind(&self) -> ResourceKind {
        self.value.kind()
    }
}

/// Result of a write against the remote store.
#[derive(Debug, Clone, PartialEq)]
pub enum PutOutcome {
    /// The write was accepted; `token` is the new authoritative timestamp.
    Accepted {
        /// Timestamp stored by the remote for this write.
        token: ChangeTimestamp,
    },
    /// The write was rejected as stale; carries the remote's current state.
    Conflict(Snapshot),
}

impl PutOutcome {
    /// Returns true if the write was accepted.
    pub fn is_accepted(&self) -> bool {
        matches!(self, PutOutcome::Accepted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_helpers() {
        let accepted = PutOutcome::Accepted {
            token: ChangeTimestamp::from_millis(5),
        };
        assert!(accepted.is_accepted());

        let conflict = PutOutcome::Conflict(Snapshot::new(
            ResourceValue::empty(ResourceKind::Bank),
            Some(ChangeTimestamp::from_millis(9)),
        ));
        assert!(!conflict.is_accepted());
        if let PutOutcome::Conflict(snapshot) = conflict {
            assert_eq!(snapshot.kind(), ResourceKind::Bank);
        }
    }
}
