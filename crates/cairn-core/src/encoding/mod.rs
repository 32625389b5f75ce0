//! Key encoding for ordered flat storage.
//!
//! This module provides the two byte encodings the index engine stores in
//! index columns:
//!
//! - [`sortable`] - An order-preserving encoding for single [`Key`]s: raw
//!   byte comparison of two encoded keys has the same sign as the logical
//!   comparison of the keys themselves. This is what lets a store that only
//!   understands byte/text comparison answer ordered range queries.
//! - [`composite`] - A packed "key set" encoding for multi-entry indexes:
//!   the distinct elements of an array key stored as a single cell value,
//!   with an exact membership test over the encoded form.
//!
//! # Sortable layout
//!
//! Each encoded key is a type tag followed by a payload:
//!
//! ```text
//! [0x01][f64, sign-tricked, big-endian]          number
//! [0x02][i64, sign-flipped, big-endian]          date (ms since epoch)
//! [0x03][bytes, 0x00-escaped][0x00 0x00]         binary
//! [0x04][utf-8, 0x00-escaped][0x00 0x00]         string
//! [0x05][element encodings...][0x00]             array
//! ```
//!
//! Tags order the categories; the array terminator `0x00` is lower than every
//! tag so a shorter array sorts before any extension of it, and the escape
//! scheme keeps embedded zero bytes from forging terminators.
//!
//! [`Key`]: crate::types::Key

pub mod composite;
pub mod sortable;
