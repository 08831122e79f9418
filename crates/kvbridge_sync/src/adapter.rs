//! Interception of host writes.

use crate::bridge::BridgeInner;
use crate::classify::{KeyClass, KeyRole};
use crate::config::RemovalMode;
use crate::state::SyncState;
use kvbridge_storage::{KeyValueStore, StorageResult};
use std::sync::Arc;
use tracing::warn;

/// The store the host uses when syncing is on.
///
/// Every call performs the real operation first, so the host sees its own
/// write immediately. Writes to synced keys are then routed to the bridge.
/// Only the real operation's error is ever returned; sync problems are logged.
#[derive(Clone)]
pub struct SyncedStore {
    inner: Arc<BridgeInner>,
}

impl SyncedStore {
    pub(crate) fn new(inner: Arc<BridgeInner>) -> Self {
        Self { inner }
    }
}

impl BridgeInner {
    fn after_local_write(
        self: &Arc<Self>,
        state: &mut SyncState,
        class: &KeyClass,
        raw: Option<&str>,
    ) {
        let kind = class.kind;
        match &class.role {
            KeyRole::Canonical => {
                if let Err(e) = self.mirror.fan_out(kind) {
                    warn!(resource = %kind, error = %e, "fan-out failed");
                }
                self.arm_push(state, kind);
            }
            KeyRole::Labels => self.arm_push(state, kind),
            KeyRole::Alias(shape) => {
                if let Err(e) = self.mirror.fan_in(kind, shape, raw) {
                    warn!(resource = %kind, error = %e, "fan-in failed");
                }
            }
        }
    }
}

impl KeyValueStore for SyncedStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.inner.store.get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let Some(class) = self.inner.route(key) else {
            return self.inner.store.set(key, value);
        };

        let mut state = self.inner.state.lock();
        self.inner.store.set(key, value)?;
        self.inner.after_local_write(&mut state, &class, Some(value));
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let Some(class) = self.inner.route(key) else {
            return self.inner.store.remove(key);
        };

        let mut state = self.inner.state.lock();
        self.inner.store.remove(key)?;
        let raw = match self.inner.config.removal_mode {
            RemovalMode::EmptyArray => {
                if let Err(e) = self.inner.store.set(key, "[]") {
                    warn!(key, error = %e, "failed to write empty array after removal");
                }
                Some("[]")
            }
            RemovalMode::Delete => None,
        };
        self.inner.after_local_write(&mut state, &class, raw);
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        self.inner.store.keys()
    }

    fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        self.inner.store.keys_with_prefix(prefix)
    }
}

impl std::fmt::Debug for SyncedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncedStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{BridgeConfig, RemovalMode};
    use crate::state::PushState;
    use crate::transport::MockRemote;
    use crate::SyncBridge;
    use kvbridge_protocol::{ResourceKind, ResourceValue};
    use kvbridge_storage::{InMemoryStore, KeyValueStore, StorageError};
    use serde_json::json;
    use std::sync::Arc;

    fn setup(config: BridgeConfig) -> (SyncBridge, Arc<InMemoryStore>) {
        let raw = Arc::new(InMemoryStore::new());
        let bridge = SyncBridge::new(config, raw.clone(), Arc::new(MockRemote::new())).unwrap();
        (bridge, raw)
    }

    #[tokio::test(start_paused = true)]
    async fn unrelated_keys_pass_through() {
        let (bridge, raw) = setup(BridgeConfig::default());
        let store = bridge.store();

        store.set("theme", "dark").unwrap();
        assert_eq!(raw.get("theme").unwrap().as_deref(), Some("dark"));
        store.remove("theme").unwrap();
        assert_eq!(raw.get("theme").unwrap(), None);

        for kind in ResourceKind::ALL {
            assert_eq!(bridge.push_state(kind), PushState::Idle);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn canonical_write_is_visible_and_arms_push() {
        let (bridge, _) = setup(BridgeConfig::default());
        let store = bridge.store();

        store.set("shop_orders", r#"[{"id":1}]"#).unwrap();
        assert_eq!(store.get("shop_orders").unwrap().as_deref(), Some(r#"[{"id":1}]"#));
        assert_eq!(store.get("my_orders").unwrap().as_deref(), Some(r#"[{"id":1}]"#));
        assert_eq!(bridge.push_state(ResourceKind::Orders), PushState::Debouncing);
    }

    #[tokio::test(start_paused = true)]
    async fn alias_write_mirrors_without_push() {
        let (bridge, raw) = setup(BridgeConfig::default());
        raw.set("shop_catalog_ann", "[]").unwrap();
        let store = bridge.store();

        store.set("products", r#"[{"id":5}]"#).unwrap();

        for key in ["shop_catalog", "goods", "catalog", "shop_catalog_ann"] {
            assert_eq!(raw.get(key).unwrap().as_deref(), Some(r#"[{"id":5}]"#), "{key}");
        }
        assert_eq!(bridge.push_state(ResourceKind::Catalog), PushState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn removal_writes_empty_array() {
        let (bridge, raw) = setup(BridgeConfig::default());
        let store = bridge.store();
        store.set("mock_bank", r#"[{"amount":1}]"#).unwrap();

        store.remove("mock_bank").unwrap();
        assert_eq!(raw.get("mock_bank").unwrap().as_deref(), Some("[]"));
        assert_eq!(bridge.read(ResourceKind::Bank).unwrap(), ResourceValue::Bank(vec![]));
        assert_eq!(bridge.push_state(ResourceKind::Bank), PushState::Debouncing);
    }

    #[tokio::test(start_paused = true)]
    async fn removal_in_delete_mode() {
        let (bridge, raw) = setup(BridgeConfig::default().with_removal_mode(RemovalMode::Delete));
        let store = bridge.store();
        store.set("shop_orders", r#"[{"id":1}]"#).unwrap();

        store.remove("shop_orders").unwrap();
        assert_eq!(raw.get("shop_orders").unwrap(), None);
        assert_eq!(raw.get("my_orders").unwrap().as_deref(), Some("[]"));
        assert_eq!(bridge.push_state(ResourceKind::Orders), PushState::Debouncing);

        // Removing an alias empties the resource locally without pushing
        bridge.flush(ResourceKind::Orders).await.unwrap();
        store.set("shop_orders", r#"[{"id":2}]"#).unwrap();
        bridge.flush(ResourceKind::Orders).await.unwrap();
        store.remove("my_orders").unwrap();
        assert_eq!(raw.get("shop_orders").unwrap().as_deref(), Some("[]"));
        assert_eq!(bridge.push_state(ResourceKind::Orders), PushState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn user_entity_write_updates_everything() {
        let (bridge, raw) = setup(BridgeConfig::default());
        let store = bridge.store();
        store
            .set("shop_users", r#"[{"id":"1","displayName":"Ann"}]"#)
            .unwrap();
        bridge.flush(ResourceKind::Users).await.unwrap();

        store
            .set("shop_user_Bob", r#"{"id":"2","displayName":"Bob"}"#)
            .unwrap();

        let users: serde_json::Value =
            serde_json::from_str(&raw.get("shop_users").unwrap().unwrap()).unwrap();
        assert_eq!(
            users,
            json!([{"id": "1", "displayName": "Ann"}, {"id": "2", "displayName": "Bob"}])
        );
        let by_lower: serde_json::Value =
            serde_json::from_str(&raw.get("shop_users_by_lower").unwrap().unwrap()).unwrap();
        assert_eq!(by_lower["bob"]["id"], "2");
        assert_eq!(bridge.push_state(ResourceKind::Users), PushState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn users_canonical_matches_what_is_pushed() {
        let raw = Arc::new(InMemoryStore::new());
        let remote = Arc::new(MockRemote::new());
        let bridge =
            SyncBridge::new(BridgeConfig::default(), raw.clone(), remote.clone()).unwrap();

        bridge
            .store()
            .set("shop_users", r#"[{"login":"kim"},{"role":"orphan"}]"#)
            .unwrap();
        bridge.flush(ResourceKind::Users).await.unwrap();

        let canonical = raw.get("shop_users").unwrap().unwrap();
        assert_eq!(raw.get("users").unwrap().as_deref(), Some(canonical.as_str()));
        let puts = remote.puts_for(ResourceKind::Users);
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].value.primary_json(), canonical);
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&canonical).unwrap(),
            json!([{"id": "kim", "displayName": "kim", "login": "kim"}])
        );
    }

    #[tokio::test(start_paused = true)]
    async fn underlying_error_is_returned() {
        let raw = Arc::new(InMemoryStore::with_quota(16));
        let bridge =
            SyncBridge::new(BridgeConfig::default(), raw.clone(), Arc::new(MockRemote::new()))
                .unwrap();

        let err = bridge
            .store()
            .set("shop_orders", &"x".repeat(64))
            .unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { .. }));
        assert_eq!(bridge.push_state(ResourceKind::Orders), PushState::Idle);
    }
}
