//! Error types for the core crate.

use thiserror::Error;

/// Result alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in the core crate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    /// A value cannot be used as an index key.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// An encoded key or key set is malformed.
    #[error("encoding error: {0}")]
    Encoding(String),
}

impl CoreError {
    /// Creates an invalid-key error.
    #[must_use]
    pub fn invalid_key(msg: impl Into<String>) -> Self {
        Self::InvalidKey(msg.into())
    }

    /// Creates an encoding error.
    #[must_use]
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }
}
