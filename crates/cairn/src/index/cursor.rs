//! Incremental consumption of query results.
//!
//! A cursor wraps the same ordered hits a bulk fetch produces but yields one
//! logical position at a time. Direction was applied when the hits were
//! materialized; the cursor adds the unique-vs-duplicates policy on top.

use cairn_core::Key;

/// Whether a cursor visits every entry or only the first per distinct key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorPolicy {
    /// Visit every logical entry.
    #[default]
    Duplicates,
    /// Visit only the first entry for each distinct key.
    Unique,
}

/// One cursor position.
#[derive(Debug, Clone, PartialEq)]
pub struct CursorPosition {
    /// The index key at this position.
    pub key: Key,
    /// The owning record's primary key.
    pub primary_key: Key,
    /// The record payload; `None` for key cursors.
    pub value: Option<serde_json::Value>,
}

/// A cursor over an executed index query.
///
/// Obtained from [`Index::open_cursor`](crate::Index::open_cursor) or
/// [`Index::open_key_cursor`](crate::Index::open_key_cursor); also usable as
/// a plain iterator.
#[derive(Debug)]
pub struct IndexCursor {
    positions: std::vec::IntoIter<CursorPosition>,
    policy: CursorPolicy,
    last_key: Option<Key>,
}

impl IndexCursor {
    pub(crate) fn new(positions: Vec<CursorPosition>, policy: CursorPolicy) -> Self {
        Self {
            positions: positions.into_iter(),
            policy,
            last_key: None,
        }
    }

    /// Advance to the next position, or `None` when exhausted.
    pub fn advance(&mut self) -> Option<CursorPosition> {
        loop {
            let position = self.positions.next()?;
            if self.policy == CursorPolicy::Unique
                && self.last_key.as_ref() == Some(&position.key)
            {
                continue;
            }
            self.last_key = Some(position.key.clone());
            return Some(position);
        }
    }
}

impl Iterator for IndexCursor {
    type Item = CursorPosition;

    fn next(&mut self) -> Option<Self::Item> {
        self.advance()
    }
}
