//! Transport layer abstraction for the remote store.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use kvbridge_protocol::{ChangeTimestamp, PutOutcome, ResourceKind, ResourceValue, Snapshot};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// A remote store handles network communication with the authoritative copy.
///
/// This trait abstracts the network layer, allowing for different
/// implementations (HTTP, in-process, mock for testing).
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetches the current value and token of a resource.
    async fn get(&self, kind: ResourceKind) -> SyncResult<Snapshot>;

    /// Writes a resource, carrying the local change timestamp as sync token.
    ///
    /// A stale token is not an error; it yields [`PutOutcome::Conflict`].
    async fn put(
        &self,
        kind: ResourceKind,
        value: &ResourceValue,
        token: ChangeTimestamp,
    ) -> SyncResult<PutOutcome>;
}

/// A put observed by [`MockRemote`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPut {
    /// Resource written.
    pub kind: ResourceKind,
    /// Value sent.
    pub value: ResourceValue,
    /// Token sent.
    pub token: ChangeTimestamp,
}

#[derive(Debug, Default)]
struct MockInner {
    snapshots: Vec<Option<Snapshot>>,
    put_outcomes: Vec<PutOutcome>,
    puts: Vec<RecordedPut>,
    gets: usize,
}

/// A scripted remote for testing.
///
/// Gets return the snapshot set with [`MockRemote::set_snapshot`] (empty with
/// no token otherwise). Puts are recorded and answered with queued outcomes,
/// falling back to accepting with the client's token.
#[derive(Debug)]
pub struct MockRemote {
    inner: Mutex<MockInner>,
    offline: AtomicBool,
    get_delay: Mutex<Option<Duration>>,
}

impl MockRemote {
    /// Creates a new mock remote.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MockInner {
                snapshots: vec![None; ResourceKind::COUNT],
                ..MockInner::default()
            }),
            offline: AtomicBool::new(false),
            get_delay: Mutex::new(None),
        }
    }

    /// Sets what gets of the snapshot's resource return.
    pub fn set_snapshot(&self, snapshot: Snapshot) {
        let index = snapshot.kind().index();
        self.inner.lock().snapshots[index] = Some(snapshot);
    }

    /// Queues the answer to the next put.
    pub fn push_put_outcome(&self, outcome: PutOutcome) {
        self.inner.lock().put_outcomes.push(outcome);
    }

    /// Makes every call fail with a retryable transport error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Delays every get. The snapshot is still taken when the get starts.
    pub fn set_get_delay(&self, delay: Option<Duration>) {
        *self.get_delay.lock() = delay;
    }

    /// Returns every put received so far.
    pub fn puts(&self) -> Vec<RecordedPut> {
        self.inner.lock().puts.clone()
    }

    /// Returns the puts received for `kind`.
    pub fn puts_for(&self, kind: ResourceKind) -> Vec<RecordedPut> {
        self.inner
            .lock()
            .puts
            .iter()
            .filter(|p| p.kind == kind)
            .cloned()
            .collect()
    }

    /// Returns how many gets were served.
    pub fn get_count(&self) -> usize {
        self.inner.lock().gets
    }

    fn check_online(&self) -> SyncResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(SyncError::transport_retryable("remote offline"))
        } else {
            Ok(())
        }
    }
}

impl Default for MockRemote {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStore for MockRemote {
    async fn get(&self, kind: ResourceKind) -> SyncResult<Snapshot> {
        // The answer is read when the request starts, as a server would
        let snapshot = self.inner.lock().snapshots[kind.index()]
            .clone()
            .unwrap_or_else(|| Snapshot::new(ResourceValue::empty(kind), None));
        let delay = *self.get_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check_online()?;

        self.inner.lock().gets += 1;
        Ok(snapshot)
    }

    async fn put(
        &self,
        kind: ResourceKind,
        value: &ResourceValue,
        token: ChangeTimestamp,
    ) -> SyncResult<PutOutcome> {
        self.check_online()?;

        let mut inner = self.inner.lock();
        inner.puts.push(RecordedPut {
            kind,
            value: value.clone(),
            token,
        });
        if inner.put_outcomes.is_empty() {
            Ok(PutOutcome::Accepted { token })
        } else {
            Ok(inner.put_outcomes.remove(0))
        }
    }
}
