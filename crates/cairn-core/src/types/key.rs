//! The logical index key model.
//!
//! [`Key`] is every value an index entry can be keyed on. Categories have a
//! fixed relative order — number < date < binary < string < array — and
//! values within a category order by their natural semantics. The
//! [`sortable`](crate::encoding::sortable) codec encodes keys so that raw
//! byte comparison reproduces exactly this order.

use std::cmp::Ordering;

use crate::error::{CoreError, CoreResult};

/// A logical index key.
///
/// The cross-category sort order is: numbers, then dates, then binary blobs,
/// then strings, then arrays. Arrays order lexicographically by element with
/// shorter-is-smaller on a common prefix.
///
/// `NaN` is not a valid key; [`Key::encode`] rejects it with
/// [`CoreError::InvalidKey`]. Infinities are valid and order numerically.
/// `-0.0` and `+0.0` are one key.
///
/// # Example
///
/// ```
/// use cairn_core::Key;
///
/// let keys = vec![
///     Key::Number(-3.0),
///     Key::Date(0),
///     Key::Binary(vec![0xFF]),
///     Key::String("a".into()),
///     Key::Array(vec![Key::Number(1.0)]),
/// ];
/// let mut sorted = keys.clone();
/// sorted.sort();
/// assert_eq!(sorted, keys);
/// ```
#[derive(Debug, Clone)]
pub enum Key {
    /// A finite or infinite double-precision number.
    Number(f64),
    /// An instant, in milliseconds since the Unix epoch.
    Date(i64),
    /// An opaque binary blob, ordered bytewise.
    Binary(Vec<u8>),
    /// A string, ordered by code-point sequence.
    String(String),
    /// An array of keys, ordered lexicographically by element.
    Array(Vec<Key>),
}

impl Key {
    /// The category rank used for cross-category ordering.
    const fn rank(&self) -> u8 {
        match self {
            Self::Number(_) => 0,
            Self::Date(_) => 1,
            Self::Binary(_) => 2,
            Self::String(_) => 3,
            Self::Array(_) => 4,
        }
    }

    /// Check that this key (and every nested element) is encodable.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidKey`] if the key contains a `NaN` number.
    pub fn validate(&self) -> CoreResult<()> {
        match self {
            Self::Number(n) if n.is_nan() => {
                Err(CoreError::invalid_key("NaN is not a valid key"))
            }
            Self::Array(items) => {
                for item in items {
                    item.validate()?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Encode this key into its order-preserving byte representation.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidKey`] for unencodable keys (`NaN`).
    pub fn encode(&self) -> CoreResult<Vec<u8>> {
        crate::encoding::sortable::encode_key(self)
    }

    /// Decode a key from its order-preserving byte representation.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Encoding`] if the bytes are malformed.
    pub fn decode(bytes: &[u8]) -> CoreResult<Self> {
        crate::encoding::sortable::decode_key(bytes)
    }

    /// Convert a JSON value into a key, if the value is key-typed.
    ///
    /// Numbers, strings, and arrays of key-typed values convert; booleans,
    /// nulls, objects, and `NaN`-producing numbers do not. This is the
    /// conversion key-path extraction uses, so a record whose extracted value
    /// is not key-typed simply contributes no index entry.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_f64().map(Self::Number),
            serde_json::Value::String(s) => Some(Self::String(s.clone())),
            serde_json::Value::Array(items) => {
                let keys: Option<Vec<Self>> = items.iter().map(Self::from_json).collect();
                keys.map(Self::Array)
            }
            _ => None,
        }
    }

    /// Whether this key is an array.
    #[inline]
    #[must_use]
    pub const fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Key {}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            // total_cmp keeps the order total; zeros are canonicalized so
            // -0.0 and +0.0 are one key, matching the codec.
            (Self::Number(a), Self::Number(b)) => {
                canonical(*a).total_cmp(&canonical(*b))
            }
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            (Self::Binary(a), Self::Binary(b)) => a.cmp(b),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            (Self::Array(a), Self::Array(b)) => a.iter().cmp(b.iter()),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// Collapse -0.0 into +0.0; every other value (NaN included) is unchanged.
fn canonical(n: f64) -> f64 {
    if n == 0.0 {
        0.0
    } else {
        n
    }
}

impl From<f64> for Key {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Vec<u8>> for Key {
    fn from(b: Vec<u8>) -> Self {
        Self::Binary(b)
    }
}
