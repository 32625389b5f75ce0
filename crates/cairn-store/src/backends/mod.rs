//! Concrete store backends.
//!
//! Currently only the in-memory reference backend. The [`StoreTx`] contract
//! is what the index engine programs against, so an on-disk backend slots in
//! without touching engine code.
//!
//! [`StoreTx`]: crate::StoreTx

mod memory;

pub use memory::MemoryStore;
