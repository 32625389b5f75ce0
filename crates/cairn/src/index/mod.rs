//! The index engine: descriptors, range compilation, fetch, and rebuilds.
//!
//! # Layout
//!
//! - [`descriptor`] - Index identity, lifecycle flags, and the slot registry
//! - [`meta`] - Persisted index metadata and table-layout constants
//! - [`query`] - Logical key ranges compiled into flat-store scans
//! - [`fetch`] - Scan execution and multi-entry expansion into ordered hits
//! - [`cursor`] - Incremental consumption of query results
//! - [`rebuild`] - Queued structural procedures (create/rename/delete)
//! - [`handle`] - The public [`Index`](handle::Index) capability

pub mod cursor;
pub mod descriptor;
pub mod fetch;
pub mod handle;
pub mod meta;
pub mod query;
pub mod rebuild;

pub use cursor::{CursorPolicy, CursorPosition, IndexCursor};
pub use descriptor::{IndexDescriptor, IndexRegistry, IndexSlot, LifecycleState};
pub use handle::Index;
pub use meta::IndexMetadata;
