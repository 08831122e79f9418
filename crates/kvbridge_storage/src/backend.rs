//! Key-value store trait definition.

use crate::error::StorageResult;
use std::sync::Arc;

/// A string-keyed, string-valued store shaped like browser `localStorage`.
///
/// # Invariants
///
/// - `set` is visible to a subsequent `get` on the same store immediately
/// - `remove` of a missing key succeeds
/// - Stores must be `Send + Sync`; the sync bridge writes from background tasks
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For testing
/// - [`super::JsonFileStore`] - For persistent storage
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails or exceeds a size limit.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Removes `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal cannot be persisted.
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// Returns every key currently in the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn keys(&self) -> StorageResult<Vec<String>>;

    /// Returns the keys starting with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        Ok(self
            .keys()?
            .into_iter()
            .filter(|k| k.starts_with(prefix))
            .collect())
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key)
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        (**self).keys()
    }

    fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        (**self).keys_with_prefix(prefix)
    }
}
