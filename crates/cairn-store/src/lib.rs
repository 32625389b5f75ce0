//! Cairn Store
//!
//! This crate provides the flat relational store abstraction the Cairn index
//! engine runs against, plus a reference in-memory backend.
//!
//! # Overview
//!
//! The backing store understands only flat tables, named nullable columns of
//! bytes, and byte comparison. Everything ordered, typed, or multi-valued is
//! the index engine's business; the store's contract is deliberately narrow:
//!
//! - [`StoreTx`] - Row and structural operations against one store handle
//! - [`ScanQuery`] / [`Predicate`] - The predicate language a scan evaluates
//! - [`Row`] - A primary key plus named nullable byte cells
//!
//! Structural operations exist because the index engine must emulate schema
//! changes the store has no primitive for: `add_column` for index creation,
//! and `copy_projection`/`rename_table` for the shadow-table rebuild that
//! stands in for a column rename.
//!
//! # Example
//!
//! ```
//! use cairn_store::backends::MemoryStore;
//! use cairn_store::{Row, ScanQuery, StoreTx};
//!
//! let mut store = MemoryStore::new();
//! store.create_table("people", &["value".into()]).unwrap();
//! store
//!     .insert("people", Row::new(b"pk1".to_vec()).with_cell("value", Some(b"ann".to_vec())))
//!     .unwrap();
//!
//! let rows = store.scan("people", &ScanQuery::new()).unwrap();
//! assert_eq!(rows.len(), 1);
//! ```
//!
//! # Modules
//!
//! - [`engine`] - Store traits, scan predicates, and error types
//! - [`backends`] - Concrete backends (currently the in-memory reference)

#![deny(clippy::unwrap_used)]

pub mod backends;
pub mod engine;

pub use engine::{
    CompareOp, Direction, Predicate, Row, ScanQuery, StoreError, StoreResult, StoreTx,
    PRIMARY_ORDERING,
};
