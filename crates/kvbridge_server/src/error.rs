//! Error types for the remote store.

use kvbridge_protocol::{ChangeTimestamp, ProtocolError};
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the remote store.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Invalid request body, header, or JSON.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Unknown resource.
    #[error("not found: {0}")]
    NotFound(String),

    /// A write carried a token older than the stored one.
    #[error("stale write: client token {client}, stored {stored}")]
    StaleWrite {
        /// Token stored by the server.
        stored: ChangeTimestamp,
        /// Token sent by the client.
        client: ChangeTimestamp,
    },

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ProtocolError> for ServerError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::UnknownResource(name) => ServerError::NotFound(name),
            other => ServerError::InvalidRequest(other.to_string()),
        }
    }
}

impl ServerError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ServerError::InvalidRequest(_) => 400,
            ServerError::NotFound(_) => 404,
            ServerError::StaleWrite { .. } => 409,
            ServerError::Internal(_) | ServerError::Io(_) => 500,
        }
    }

    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}
