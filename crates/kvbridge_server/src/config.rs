//! Server configuration.

use std::net::SocketAddr;

/// Configuration for the remote store.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
    /// Whether stale writes are rejected.
    ///
    /// When false, tokens are still tracked and returned but every
    /// well-formed write is stored.
    pub enforce_tokens: bool,
}

impl ServerConfig {
    /// Creates a new server configuration.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            max_body_bytes: 1024 * 1024,
            enforce_tokens: true,
        }
    }

    /// Sets the maximum request body size.
    pub fn with_max_body_bytes(mut self, bytes: usize) -> Self {
        self.max_body_bytes = bytes;
        self
    }

    /// Switches between enforced and advisory tokens.
    pub fn with_enforce_tokens(mut self, enforce: bool) -> Self {
        self.enforce_tokens = enforce;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([127, 0, 0, 1], 7070)))
    }
}
