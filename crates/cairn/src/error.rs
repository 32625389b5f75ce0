//! Engine error taxonomy.
//!
//! Five kinds, surfaced exactly as the operation contracts describe:
//!
//! - [`EngineError::Constraint`] — uniqueness violation or duplicate index
//!   name; never retried, any partial backfill rolled back first
//! - [`EngineError::InvalidState`] — operation against a deleted index, or
//!   outside the transaction phase it requires
//! - [`EngineError::Data`] — a required key/range argument is missing
//! - [`EngineError::InvalidKey`] — a key value that cannot be encoded
//! - [`EngineError::Unknown`] — an underlying storage operation failed
//!
//! The only swallowed failure anywhere in the engine is the documented
//! per-record skip during backfill key extraction.

use cairn_core::CoreError;
use cairn_store::StoreError;
use thiserror::Error;

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by index operations.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// A uniqueness or naming constraint was violated.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// The operation is not valid in the current lifecycle/transaction state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A required key or range argument was missing or unusable.
    #[error("data error: {0}")]
    Data(String),

    /// A key value could not be encoded.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// The underlying storage operation failed.
    #[error("storage failure: {0}")]
    Unknown(#[from] StoreError),
}

impl EngineError {
    /// Build a [`EngineError::Constraint`].
    pub fn constraint(msg: impl Into<String>) -> Self {
        Self::Constraint(msg.into())
    }

    /// Build a [`EngineError::InvalidState`].
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Build a [`EngineError::Data`].
    pub fn data(msg: impl Into<String>) -> Self {
        Self::Data(msg.into())
    }

    /// Stored bytes that should have decoded cleanly did not.
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Unknown(StoreError::Corrupt(msg.into()))
    }
}

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidKey(msg) => Self::InvalidKey(msg),
            // Malformed stored encodings mean the cell bytes are bad, not
            // the caller's key.
            CoreError::Encoding(msg) => Self::Unknown(StoreError::Corrupt(msg)),
        }
    }
}
