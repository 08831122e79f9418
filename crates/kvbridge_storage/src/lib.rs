//! # KvBridge Storage
//!
//! The local key-value store abstraction the sync bridge sits in front of.
//!
//! Stores are **opaque string maps**: keys and values are plain strings and
//! the store never interprets them. JSON decoding belongs to the bridge.
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For tests and ephemeral hosts, with an optional quota
//! - [`JsonFileStore`] - Persists the whole map to one JSON file with atomic
//!   replace-on-write
//!
//! ## Example
//!
//! ```rust
//! use kvbridge_storage::{InMemoryStore, KeyValueStore};
//!
//! let store = InMemoryStore::new();
//! store.set("shop_orders", "[]").unwrap();
//! assert_eq!(store.get("shop_orders").unwrap().as_deref(), Some("[]"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::KeyValueStore;
pub use error::{StorageError, StorageResult};
pub use file::JsonFileStore;
pub use memory::InMemoryStore;
