//! # KvBridge Protocol
//!
//! Resource model and wire types shared by the KvBridge sync bridge and the
//! reference remote store.
//!
//! This crate provides:
//! - [`ResourceKind`] for the four synchronized resources
//! - [`ChangeTimestamp`] sync tokens and the [`Clock`] that produces them
//! - [`ResourceValue`] canonical values with lenient and strict wire decoding
//! - [`Account`] normalization for user records
//! - [`Snapshot`] / [`PutOutcome`] exchanged over the transport
//! - The optimistic-concurrency write rule ([`decide_write`])
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod account;
mod conflict;
mod error;
mod messages;
mod resource;
mod token;
mod value;

pub use account::Account;
pub use conflict::{decide_write, WriteDecision};
pub use error::{ProtocolError, ProtocolResult};
pub use messages::{PutOutcome, Snapshot, SYNC_TS_HEADER};
pub use resource::ResourceKind;
pub use token::{ChangeTimestamp, Clock, ManualClock, SystemClock};
pub use value::{parse_json_array, to_json_string, ResourceValue};
