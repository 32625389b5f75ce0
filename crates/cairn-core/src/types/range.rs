//! Key ranges with open/closed bounds.

use crate::types::Key;

/// A logical key range.
///
/// A `None` bound means the range is unbounded on that side. A bare key is
/// sugar for a closed single-key range, see [`KeyRange::only`].
///
/// # Example
///
/// ```
/// use cairn_core::{Key, KeyRange};
///
/// let range = KeyRange::lower_bound(Key::Number(5.0), true);
/// assert!(!range.contains(&Key::Number(5.0)));
/// assert!(range.contains(&Key::Number(5.1)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange {
    /// Lower bound, or `None` for unbounded.
    pub lower: Option<Key>,
    /// Upper bound, or `None` for unbounded.
    pub upper: Option<Key>,
    /// Whether the lower bound is exclusive.
    pub lower_open: bool,
    /// Whether the upper bound is exclusive.
    pub upper_open: bool,
}

impl KeyRange {
    /// A range matching exactly one key.
    #[must_use]
    pub fn only(key: Key) -> Self {
        Self { lower: Some(key.clone()), upper: Some(key), lower_open: false, upper_open: false }
    }

    /// A range bounded below only.
    #[must_use]
    pub const fn lower_bound(key: Key, open: bool) -> Self {
        Self { lower: Some(key), upper: None, lower_open: open, upper_open: false }
    }

    /// A range bounded above only.
    #[must_use]
    pub const fn upper_bound(key: Key, open: bool) -> Self {
        Self { lower: None, upper: Some(key), lower_open: false, upper_open: open }
    }

    /// A range bounded on both sides.
    #[must_use]
    pub const fn bound(lower: Key, upper: Key, lower_open: bool, upper_open: bool) -> Self {
        Self { lower: Some(lower), upper: Some(upper), lower_open, upper_open }
    }

    /// An unbounded range matching every key.
    #[must_use]
    pub const fn all() -> Self {
        Self { lower: None, upper: None, lower_open: false, upper_open: false }
    }

    /// Whether this range matches exactly one key.
    #[must_use]
    pub fn is_only(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Some(lo), Some(hi)) => !self.lower_open && !self.upper_open && lo == hi,
            _ => false,
        }
    }

    /// Whether a key falls inside the range.
    #[must_use]
    pub fn contains(&self, key: &Key) -> bool {
        if let Some(lower) = &self.lower {
            if self.lower_open {
                if key <= lower {
                    return false;
                }
            } else if key < lower {
                return false;
            }
        }
        if let Some(upper) = &self.upper {
            if self.upper_open {
                if key >= upper {
                    return false;
                }
            } else if key > upper {
                return false;
            }
        }
        true
    }
}

impl From<Key> for KeyRange {
    fn from(key: Key) -> Self {
        Self::only(key)
    }
}
