//! # KvBridge Server
//!
//! Reference implementation of the remote store the sync bridge talks to.
//!
//! This crate provides:
//! - Per-resource storage with a monotonic change timestamp
//! - Request handlers for get/put with body validation
//! - The optimistic-concurrency check (stale writes get `409`)
//! - An axum router exposing `GET/PUT /api/{catalog,orders,bank,users}`
//!
//! # Protocol
//!
//! 1. `GET` returns the resource body and its token in `X-Sync-Ts`
//! 2. `PUT` carries the client's token in `X-Sync-Ts`
//! 3. A token older than the stored one is rejected with `409` and the
//!    current body; otherwise the write is stored and the new token returned
//!
//! Persistence is in-memory; durable storage is left to deployments.

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Production code MUST NOT use panic!/unwrap()/expect()
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod handler;
mod http;
mod server;
mod store;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{HandlerContext, RequestHandler};
pub use http::{router, serve};
pub use server::SyncServer;
pub use store::ResourceStore;
