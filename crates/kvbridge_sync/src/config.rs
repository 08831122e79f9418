//! Configuration for the sync bridge.

use crate::classify::KeyRules;
use kvbridge_protocol::ResourceKind;
use std::time::Duration;

/// What a host `remove` of a synced key leaves behind locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemovalMode {
    /// The key is rewritten as `[]` after removal.
    #[default]
    EmptyArray,
    /// The key stays absent.
    Delete,
}

/// Configuration for the sync bridge.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Delay between the last local edit and the push.
    pub debounce: Duration,
    /// Interval between pulls.
    pub pull_interval: Duration,
    /// How long after a local edit pulls may not overwrite the resource.
    pub edit_lock: Duration,
    /// How long after a local edit an unchanged remote token is not compared.
    pub dirty_window: Duration,
    /// Timeout for a single request to the remote store.
    pub request_timeout: Duration,
    /// Item field the catalog labels are derived from.
    pub label_field: String,
    /// Local effect of removals.
    pub removal_mode: RemovalMode,
    /// Resources that are synced.
    pub resources: Vec<ResourceKind>,
    /// Local key layout.
    pub keys: KeyRules,
}

impl BridgeConfig {
    /// Creates a configuration with default timings.
    pub fn new() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            pull_interval: Duration::from_secs(5),
            edit_lock: Duration::from_millis(1500),
            dirty_window: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
            label_field: "category".to_string(),
            removal_mode: RemovalMode::EmptyArray,
            resources: ResourceKind::ALL.to_vec(),
            keys: KeyRules::default(),
        }
    }

    /// Sets the debounce delay.
    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.debounce = delay;
        self
    }

    /// Sets the pull interval.
    pub fn with_pull_interval(mut self, interval: Duration) -> Self {
        self.pull_interval = interval;
        self
    }

    /// Sets the edit-lock duration.
    pub fn with_edit_lock(mut self, duration: Duration) -> Self {
        self.edit_lock = duration;
        self
    }

    /// Sets the dirty-window duration.
    pub fn with_dirty_window(mut self, duration: Duration) -> Self {
        self.dirty_window = duration;
        self
    }

    /// Sets the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the catalog label field.
    pub fn with_label_field(mut self, field: impl Into<String>) -> Self {
        self.label_field = field.into();
        self
    }

    /// Sets the removal mode.
    pub fn with_removal_mode(mut self, mode: RemovalMode) -> Self {
        self.removal_mode = mode;
        self
    }

    /// Restricts syncing to `resources`.
    pub fn with_resources(mut self, resources: impl IntoIterator<Item = ResourceKind>) -> Self {
        self.resources = resources.into_iter().collect();
        self.resources.sort_by_key(ResourceKind::index);
        self.resources.dedup();
        self
    }

    /// Sets the key layout.
    pub fn with_keys(mut self, keys: KeyRules) -> Self {
        self.keys = keys;
        self
    }

    /// Returns true if `kind` is synced.
    pub fn is_enabled(&self, kind: ResourceKind) -> bool {
        self.resources.contains(&kind)
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::new()
    }
}
