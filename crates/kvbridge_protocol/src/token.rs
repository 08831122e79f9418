//! Change timestamps (sync tokens) and the clocks that produce them.

use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// A monotonically non-decreasing change timestamp in wall-clock milliseconds.
///
/// Held locally as the time of the last local edit and remotely as the time of
/// the last accepted write. Sent with every write as the sync token.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ChangeTimestamp(u64);

impl ChangeTimestamp {
    /// The zero timestamp; no write has happened yet.
    pub const ZERO: ChangeTimestamp = ChangeTimestamp(0);

    /// Creates a timestamp from milliseconds.
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp in milliseconds.
    pub const fn as_millis(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChangeTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChangeTimestamp {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(ChangeTimestamp)
            .map_err(|_| ProtocolError::InvalidToken(s.to_string()))
    }
}

impl From<u64> for ChangeTimestamp {
    fn from(millis: u64) -> Self {
        Self(millis)
    }
}

/// Source of wall-clock time for change timestamps.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Returns the current time as a change timestamp.
    fn now(&self) -> ChangeTimestamp;
}

/// Clock backed by [`SystemTime`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> ChangeTimestamp {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        ChangeTimestamp(u64::try_from(millis).unwrap_or(u64::MAX))
    }
}

/// A manually driven clock for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    /// Creates a clock reading `millis`.
    pub fn new(millis: u64) -> Self {
        Self {
            millis: AtomicU64::new(millis),
        }
    }

    /// Sets the current reading.
    pub fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    /// Moves the clock forward by `millis`.
    pub fn advance(&self, millis: u64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> ChangeTimestamp {
        ChangeTimestamp(self.millis.load(Ordering::SeqCst))
    }
}
