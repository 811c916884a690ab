//! Error types for sonarlink
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for sonarlink operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for sonarlink
#[derive(Error, Debug)]
pub enum Error {
    /// One or more payload fields failed validation
    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// Payload could not be decoded at all
    #[error("Malformed payload: {0}")]
    Malformed(String),

    /// A connection with the same name already exists
    #[error("Connection name already in use: {0}")]
    Conflict(String),

    /// Connection not found
    #[error("Connection not found: {0}")]
    NotFound(String),

    /// The analytics server could not be reached (DNS, proxy, timeout, refused)
    #[error("Upstream unreachable: {0}")]
    Connectivity(String),

    /// The analytics server answered with something other than 200
    #[error("Unexpected status code: {status}")]
    UnexpectedStatus {
        /// Status code returned by the upstream
        status: u16,
    },

    /// Connection store errors
    #[error("Connection store error: {0}")]
    Store(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a malformed payload error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    /// Create a name conflict error
    pub fn conflict(name: impl Into<String>) -> Self {
        Self::Conflict(name.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a connectivity error
    pub fn connectivity(msg: impl Into<String>) -> Self {
        Self::Connectivity(msg.into())
    }

    /// Create an unexpected status error
    pub fn unexpected_status(status: u16) -> Self {
        Self::UnexpectedStatus { status }
    }

    /// Create a connection store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error was caused by the caller's input
    ///
    /// Covers both undecodable payloads and field-level validation failures.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Malformed(_))
    }

    /// Whether this error came from the connectivity check
    pub fn is_probe_failure(&self) -> bool {
        matches!(self, Self::Connectivity(_) | Self::UnexpectedStatus { .. })
    }
}
