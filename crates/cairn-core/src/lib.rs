//! Cairn Core
//!
//! This crate provides the fundamental types for Cairn's key-ordered index
//! engine: the logical key model, the order-preserving key codec, key ranges,
//! and key-path extraction.
//!
//! # Overview
//!
//! - **Keys**: [`Key`] models every value an index can be keyed on — numbers,
//!   dates, binary blobs, strings, and arrays thereof — with a total order
//!   across categories.
//! - **Codec**: [`encoding::sortable`] encodes a [`Key`] into bytes whose raw
//!   byte comparison reproduces the logical key order, which is what lets a
//!   flat store that only understands byte/text comparison serve ordered
//!   index scans.
//! - **Key sets**: [`encoding::composite`] packs the distinct elements of an
//!   array key into a single cell value for multi-entry indexes, with an
//!   exact membership test over the encoded form.
//! - **Ranges**: [`KeyRange`] carries lower/upper bounds with open/closed
//!   flags; a bare key is sugar for a closed single-key range.
//! - **Key paths**: [`KeyPath`] identifies which part of a record supplies an
//!   index's key and evaluates against JSON record values.
//!
//! # Example
//!
//! ```
//! use cairn_core::{Key, KeyRange};
//!
//! let a = Key::Number(-1.5);
//! let b = Key::String("x".into());
//!
//! // Encoded bytes compare the same way the logical keys do.
//! let ea = a.encode().unwrap();
//! let eb = b.encode().unwrap();
//! assert!(ea < eb);
//! assert_eq!(Key::decode(&ea).unwrap(), a);
//!
//! let range = KeyRange::bound(Key::Number(0.0), Key::Number(10.0), false, true);
//! assert!(range.contains(&Key::Number(0.0)));
//! assert!(!range.contains(&Key::Number(10.0)));
//! ```
//!
//! # Modules
//!
//! - [`types`] - [`Key`], [`KeyRange`], [`KeyPath`]
//! - [`encoding`] - The sortable codec and the multi-entry key set codec
//! - [`error`] - Error types ([`CoreError`])

// Deny unwrap in library code to ensure proper error handling
#![deny(clippy::unwrap_used)]

pub mod encoding;
pub mod error;
pub mod types;

pub use error::{CoreError, CoreResult};
pub use types::{Key, KeyPath, KeyRange};
