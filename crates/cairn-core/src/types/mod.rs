//! Core data types for the index engine.
//!
//! - [`Key`] - The logical key model with a total cross-category order
//! - [`KeyRange`] - Bounded/unbounded key ranges with open/closed flags
//! - [`KeyPath`] - Record key extraction expressions

mod key;
mod keypath;
mod range;

pub use key::Key;
pub use keypath::KeyPath;
pub use range::KeyRange;
