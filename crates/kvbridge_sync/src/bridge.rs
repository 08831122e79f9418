//! The sync bridge.

use crate::adapter::SyncedStore;
use crate::classify::KeyClass;
use crate::config::BridgeConfig;
use crate::error::{SyncError, SyncResult};
use crate::http::HttpRemote;
use crate::mirror::MirrorEngine;
use crate::pull::{PullLoopHandle, PullOutcome};
use crate::push::PushOutcome;
use crate::state::{BridgeStats, PushState, SyncState};
use crate::transport::RemoteStore;
use kvbridge_protocol::{ChangeTimestamp, Clock, ResourceKind, ResourceValue, SystemClock};
use kvbridge_storage::KeyValueStore;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::runtime::Handle;

/// Shared bridge internals.
pub(crate) struct BridgeInner {
    pub(crate) config: BridgeConfig,
    /// The undecorated local store; writes here are silent.
    pub(crate) store: Arc<dyn KeyValueStore>,
    pub(crate) mirror: MirrorEngine,
    pub(crate) remote: Arc<dyn RemoteStore>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) state: Mutex<SyncState>,
    pub(crate) runtime: Handle,
}

impl BridgeInner {
    /// Classifies `key`, ignoring resources that are not synced.
    pub(crate) fn route(&self, key: &str) -> Option<KeyClass> {
        self.config
            .keys
            .classify(key)
            .filter(|class| self.config.is_enabled(class.kind))
    }
}

/// Keeps a local key-value store in sync with a remote store.
///
/// The host reads and writes through [`SyncBridge::store`]; canonical-key
/// writes are debounced and pushed, alias writes are folded into the
/// canonical key, and [`SyncBridge::start`] polls the remote store.
///
/// Cloning is cheap and every clone drives the same state.
///
/// # Example
///
/// ```no_run
/// use kvbridge_storage::{InMemoryStore, KeyValueStore};
/// use kvbridge_sync::{BridgeConfig, SyncBridge};
/// use std::sync::Arc;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let bridge = SyncBridge::connect(
///     BridgeConfig::default(),
///     Arc::new(InMemoryStore::new()),
///     "http://127.0.0.1:7070",
/// )?;
/// let _pulls = bridge.start();
///
/// let store = bridge.store();
/// store.set("shop_orders", r#"[{"id":1}]"#)?;
/// bridge.flush_all().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SyncBridge {
    pub(crate) inner: Arc<BridgeInner>,
}

impl SyncBridge {
    /// Creates a bridge on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NoRuntime`] when called outside a runtime.
    pub fn new(
        config: BridgeConfig,
        store: Arc<dyn KeyValueStore>,
        remote: Arc<dyn RemoteStore>,
    ) -> SyncResult<Self> {
        Self::with_clock(config, store, remote, Arc::new(SystemClock))
    }

    /// Creates a bridge talking HTTP to `base_url`, with requests bounded by
    /// the config's request timeout.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built or outside a runtime.
    pub fn connect(
        config: BridgeConfig,
        store: Arc<dyn KeyValueStore>,
        base_url: impl Into<String>,
    ) -> SyncResult<Self> {
        let remote = HttpRemote::new(base_url, config.request_timeout)?;
        Self::new(config, store, Arc::new(remote))
    }

    /// Creates a bridge with an explicit clock for change timestamps.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NoRuntime`] when called outside a runtime.
    pub fn with_clock(
        config: BridgeConfig,
        store: Arc<dyn KeyValueStore>,
        remote: Arc<dyn RemoteStore>,
        clock: Arc<dyn Clock>,
    ) -> SyncResult<Self> {
        let runtime = Handle::try_current().map_err(|_| SyncError::NoRuntime)?;
        let mirror = MirrorEngine::new(Arc::clone(&store), config.keys.clone());
        Ok(Self {
            inner: Arc::new(BridgeInner {
                config,
                store,
                mirror,
                remote,
                clock,
                state: Mutex::new(SyncState::default()),
                runtime,
            }),
        })
    }

    /// Returns the intercepting store the host should use.
    pub fn store(&self) -> SyncedStore {
        SyncedStore::new(Arc::clone(&self.inner))
    }

    /// Returns the configuration.
    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    /// Classifies `key` against the configured layout.
    pub fn classify(&self, key: &str) -> Option<KeyClass> {
        self.inner.route(key)
    }

    /// Reads the normalized canonical value of `kind`.
    ///
    /// # Errors
    ///
    /// Returns an error if the local store cannot be read.
    pub fn read(&self, kind: ResourceKind) -> SyncResult<ResourceValue> {
        let _state = self.inner.state.lock();
        Ok(self.inner.mirror.read_canonical(kind)?)
    }

    /// Arms a debounced push of `kind`, replacing any pending one.
    pub fn schedule_push(&self, kind: ResourceKind) {
        if !self.inner.config.is_enabled(kind) {
            return;
        }
        let mut state = self.inner.state.lock();
        self.inner.arm_push(&mut state, kind);
    }

    /// Sends the pending push of `kind` now. Returns `None` if none was armed.
    pub async fn flush(&self, kind: ResourceKind) -> Option<PushOutcome> {
        self.inner.flush(kind).await
    }

    /// Sends every pending push now.
    pub async fn flush_all(&self) -> Vec<(ResourceKind, PushOutcome)> {
        let mut outcomes = Vec::new();
        for &kind in &self.inner.config.resources {
            if let Some(outcome) = self.inner.flush(kind).await {
                outcomes.push((kind, outcome));
            }
        }
        outcomes
    }

    /// Pulls `kind` once.
    pub async fn pull(&self, kind: ResourceKind) -> PullOutcome {
        self.inner.pull_resource(kind).await
    }

    /// Pulls every enabled resource once.
    pub async fn pull_all(&self) -> Vec<(ResourceKind, PullOutcome)> {
        let mut outcomes = Vec::new();
        for &kind in &self.inner.config.resources {
            outcomes.push((kind, self.inner.pull_resource(kind).await));
        }
        outcomes
    }

    /// Starts the pull loop. The first pull happens immediately.
    pub fn start(&self) -> PullLoopHandle {
        PullLoopHandle::spawn(&self.inner)
    }

    /// Returns the push state of `kind`.
    pub fn push_state(&self, kind: ResourceKind) -> PushState {
        self.inner.state.lock().resource(kind).push_state()
    }

    /// Returns the local change timestamp of `kind`.
    pub fn local_token(&self, kind: ResourceKind) -> ChangeTimestamp {
        self.inner.state.lock().resource(kind).local_token
    }

    /// Returns activity counters.
    pub fn stats(&self) -> BridgeStats {
        self.inner.state.lock().stats.clone()
    }
}

impl std::fmt::Debug for SyncBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncBridge")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}
