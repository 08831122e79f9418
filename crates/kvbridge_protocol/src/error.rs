//! Error types for protocol decoding.

use crate::resource::ResourceKind;
use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while decoding or validating protocol data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A request body did not have the shape required for the resource.
    #[error("invalid {resource} body: {message}")]
    InvalidBody {
        /// Resource the body was addressed to.
        resource: ResourceKind,
        /// Human readable reason.
        message: String,
    },

    /// A resource name did not match any known resource.
    #[error("unknown resource: {0}")]
    UnknownResource(String),

    /// A sync token could not be parsed.
    #[error("invalid sync token: {0:?}")]
    InvalidToken(String),
}

impl ProtocolError {
    /// Creates an invalid body error.
    pub fn invalid_body(resource: ResourceKind, message: impl Into<String>) -> Self {
        Self::InvalidBody {
            resource,
            message: message.into(),
        }
    }
}
