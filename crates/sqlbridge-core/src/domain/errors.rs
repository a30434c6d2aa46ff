//! Domain error types
//!
//! `BridgeError` is the single error type returned by every hook and registry
//! operation. `BackendError` carries whatever the backing plugin reported and
//! is wrapped verbatim in `BridgeError::Backing`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::capability::Unavailable;

/// Result alias used across the hook and registry surfaces
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors surfaced by hooks and the connection registry
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// A required parameter was missing or empty
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A live connection already exists for this key
    #[error("Connection already exists: {0}")]
    AlreadyExists(String),

    /// No live connection matches this key
    #[error("Connection not found: {0}")]
    NotFound(String),

    /// The capability is not supported on the current platform
    #[error("Feature not available: {0}")]
    FeatureNotAvailable(Unavailable),

    /// The backing plugin reported a failure
    #[error("Backing failure: {0}")]
    Backing(#[from] BackendError),
}

impl BridgeError {
    /// Shorthand for an `InvalidArgument` error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Returns true for `FeatureNotAvailable`
    pub fn is_not_available(&self) -> bool {
        matches!(self, Self::FeatureNotAvailable(_))
    }
}

/// A failure reported by a backing plugin
///
/// The message and the optional structured payload are preserved exactly as
/// the adapter produced them.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct BackendError {
    /// Human-readable failure message
    pub message: String,
    /// Structured details, if the backend supplied any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl BackendError {
    /// Creates a backend error with just a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            payload: None,
        }
    }

    /// Attaches a structured payload
    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }
}
