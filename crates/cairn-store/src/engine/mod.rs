//! Store traits and abstractions.
//!
//! This module defines the contract backends implement:
//!
//! - [`StoreTx`] - Row access plus the structural operations the index
//!   engine's schema procedures need
//! - [`ScanQuery`] - Predicate conjunction, ordering directive, and limit
//!
//! # Error Handling
//!
//! All operations return [`StoreResult<T>`], an alias for
//! `Result<T, StoreError>`.

mod error;
mod traits;

pub use error::{StoreError, StoreResult};
pub use traits::{
    CompareOp, Direction, Predicate, Row, ScanQuery, StoreTx, PRIMARY_ORDERING,
};
