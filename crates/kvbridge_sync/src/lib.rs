//! # KvBridge Sync
//!
//! Keeps a local key-value store in sync with a remote REST store.
//!
//! This crate provides:
//! - Interception of host writes ([`SyncedStore`])
//! - Key classification into canonical and alias keys ([`KeyRules`])
//! - Fan-out/fan-in mirroring between canonical and alias keys
//! - A debounced push pipeline with optimistic concurrency
//! - A periodic pull loop with edit-lock suppression
//! - Transports: [`HttpRemote`] and [`MockRemote`]
//!
//! ## Architecture
//!
//! ```text
//! host write -> SyncedStore -> classify -> fan-in (aliases) -> debounce -> PUT
//! pull tick  -> GET -> edit lock / pending / dirty checks -> silent write -> fan-out
//! ```
//!
//! ## Key Invariants
//!
//! - The host always sees its own write immediately
//! - Bridge writes are silent and never re-enter interception
//! - At most one debounce timer per resource
//! - A pull never overwrites a resource inside its edit-lock window
//! - A rejected push adopts the server value unless a newer edit is pending
//! - The local change timestamp never decreases

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod adapter;
mod bridge;
mod classify;
mod config;
mod conflict;
mod error;
mod http;
mod mirror;
mod pull;
mod push;
mod state;
mod transport;

pub use adapter::SyncedStore;
pub use bridge::SyncBridge;
pub use classify::{AliasShape, KeyClass, KeyRole, KeyRules, ResourceKeys};
pub use config::{BridgeConfig, RemovalMode};
pub use error::{SyncError, SyncResult};
pub use http::HttpRemote;
pub use pull::{PullLoopHandle, PullOutcome};
pub use push::{derive_labels, PushOutcome};
pub use state::{BridgeStats, PushState};
pub use transport::{MockRemote, RecordedPut, RemoteStore};
