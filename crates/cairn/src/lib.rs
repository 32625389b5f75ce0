//! Cairn
//!
//! A document-oriented, key-ordered secondary index engine layered on a flat
//! relational store. Callers manage named object stores (record collections
//! keyed by a primary key) and attach indexes to them; each index maps a key
//! extracted from the record by a key path back to the owning record. The
//! engine gives those indexes exact ordering, uniqueness, and range-query
//! semantics over a store that only understands tables, nullable byte
//! columns, and byte comparison.
//!
//! # Example
//!
//! ```
//! use cairn::{IndexOptions, Key, KeyPath, ObjectStore, StoreOptions, TransactionMode};
//! use cairn_store::backends::MemoryStore;
//!
//! # fn main() -> Result<(), cairn::EngineError> {
//! let people = ObjectStore::create(
//!     MemoryStore::new(),
//!     "people",
//!     StoreOptions { auto_increment: true },
//! )?;
//!
//! people.begin(TransactionMode::VersionChange)?;
//! people.put(&serde_json::json!({"name": "Ann", "tags": ["x", "y"]}), None)?;
//! let tags = people.create_index(
//!     "tagIdx",
//!     KeyPath::single("tags"),
//!     IndexOptions { multi_entry: true, ..IndexOptions::default() },
//! )?;
//!
//! assert_eq!(tags.count(None)?, 2);
//! let ann = tags.get(Key::String("y".into()))?;
//! assert!(ann.is_some());
//! people.commit()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ObjectStore / Index handles
//!         │  every operation is a queued task
//!         ▼
//! txn (SerialQueue: FIFO, error latching, abort reverts)
//!         │
//!         ├── index::query    logical range → scan predicates + post-check
//!         ├── index::fetch    scan → ordered logical entries
//!         ├── index::rebuild  structural step chains (create/rename/delete)
//!         ▼
//! cairn-store (flat tables, byte cells)   cairn-core (keys, codecs)
//! ```

#![deny(clippy::unwrap_used)]

pub mod codec;
pub mod error;
pub mod index;
pub mod store;
pub mod txn;

pub use cairn_core::{Key, KeyPath, KeyRange};
pub use cairn_store::Direction;

pub use codec::{JsonCodec, RecordCodec};
pub use error::{EngineError, EngineResult};
pub use index::{CursorPolicy, CursorPosition, Index, IndexCursor};
pub use store::{IndexOptions, ObjectStore, StoreOptions};
pub use txn::{SerialQueue, TaskQueue, TransactionMode};
