//! In-memory key-value store.

use crate::backend::KeyValueStore;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// An in-memory key-value store.
///
/// Suitable for:
/// - Unit and integration tests
/// - Hosts that do not need persistence
///
/// An optional quota bounds the total size of keys plus values, so hosts
/// can exercise the same failure a browser raises when storage is full.
///
/// # Example
///
/// ```rust
/// use kvbridge_storage::{InMemoryStore, KeyValueStore};
///
/// let store = InMemoryStore::with_quota(8);
/// assert!(store.set("k", "small").is_ok());
/// assert!(store.set("k", "far too large").is_err());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
    quota: Option<usize>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose keys plus values may not exceed `limit` bytes.
    #[must_use]
    pub fn with_quota(limit: usize) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            quota: Some(limit),
        }
    }

    /// Creates a store pre-populated with `entries`.
    #[must_use]
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: RwLock::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
            quota: None,
        }
    }

    /// Returns a copy of all entries.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries.read().clone()
    }

    /// Returns the number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the store holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn used_bytes(entries: &BTreeMap<String, String>) -> usize {
        entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.entries.write();
        if let Some(limit) = self.quota {
            let current = Self::used_bytes(&entries);
            let replaced = entries.get(key).map_or(0, |old| key.len() + old.len());
            let needed = current - replaced + key.len() + value.len();
            if needed > limit {
                return Err(StorageError::QuotaExceeded { needed, limit });
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.entries.read().keys().cloned().collect())
    }

    fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        Ok(self
            .entries
            .read()
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn memory_new_is_empty() {
        let store = InMemoryStore::new();
        assert!(store.is_empty());
        assert_eq!(store.get("missing").unwrap(), None);
    }

    #[test]
    fn set_get_remove() {
        let store = InMemoryStore::new();
        store.set("a", "1").unwrap();
        store.set("a", "2").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("2"));

        store.remove("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);

        // Removing a missing key is fine
        store.remove("a").unwrap();
    }

    #[test]
    fn prefix_listing() {
        let store = InMemoryStore::with_entries([
            ("shop_orders", "[]"),
            ("shop_orders_ann", "[]"),
            ("shop_orders_bob", "[]"),
            ("shop_ordersx", "[]"),
            ("other", "1"),
        ]);
        assert_eq!(
            store.keys_with_prefix("shop_orders_").unwrap(),
            vec!["shop_orders_ann".to_string(), "shop_orders_bob".to_string()]
        );
        assert_eq!(store.keys().unwrap().len(), 5);
    }

    #[test]
    fn quota_rejects_oversized_writes() {
        let store = InMemoryStore::with_quota(10);
        store.set("key", "1234").unwrap();
        // Replacing counts only the difference
        store.set("key", "1234567").unwrap();
        let err = store.set("key2", "x").unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { limit: 10, .. }));
        // Failed write leaves the old value
        assert_eq!(store.get("key").unwrap().as_deref(), Some("1234567"));
        assert_eq!(store.get("key2").unwrap(), None);
    }

    proptest! {
        #[test]
        fn prefix_listing_matches_filter(
            keys in proptest::collection::vec("[a-c_]{0,6}", 0..24),
            prefix in "[a-c_]{0,3}",
        ) {
            let store = InMemoryStore::new();
            for k in &keys {
                store.set(k, "v").unwrap();
            }
            let mut expected: Vec<String> = store
                .keys()
                .unwrap()
                .into_iter()
                .filter(|k| k.starts_with(&prefix))
                .collect();
            expected.sort();
            prop_assert_eq!(store.keys_with_prefix(&prefix).unwrap(), expected);
        }
    }
}
