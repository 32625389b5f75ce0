//! Key-path extraction over JSON record values.

use serde::{Deserialize, Serialize};

use crate::types::Key;

/// An expression identifying which part of a record supplies an index's key.
///
/// A single path is a dotted property path (`"address.city"`); a compound
/// path is an ordered list of single paths whose extracted values form an
/// array key.
///
/// # Example
///
/// ```
/// use cairn_core::{Key, KeyPath};
///
/// let record = serde_json::json!({"name": "Ann", "address": {"zip": 90210}});
///
/// let path = KeyPath::single("address.zip");
/// assert_eq!(path.evaluate(&record), Some(Key::Number(90210.0)));
///
/// let compound = KeyPath::compound(["name", "address.zip"]);
/// assert_eq!(
///     compound.evaluate(&record),
///     Some(Key::Array(vec![Key::String("Ann".into()), Key::Number(90210.0)]))
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyPath {
    /// A dotted property path.
    Single(String),
    /// An ordered list of dotted property paths.
    Compound(Vec<String>),
}

impl KeyPath {
    /// Create a single dotted path.
    #[must_use]
    pub fn single(path: impl Into<String>) -> Self {
        Self::Single(path.into())
    }

    /// Create a compound path from an ordered list of dotted paths.
    #[must_use]
    pub fn compound<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Compound(paths.into_iter().map(Into::into).collect())
    }

    /// Extract the key this path identifies from a record.
    ///
    /// Returns `None` when the path does not resolve or resolves to a value
    /// that is not key-typed; such records contribute no index entry.
    #[must_use]
    pub fn evaluate(&self, record: &serde_json::Value) -> Option<Key> {
        match self {
            Self::Single(path) => Key::from_json(resolve(record, path)?),
            Self::Compound(paths) => {
                let keys: Option<Vec<Key>> =
                    paths.iter().map(|p| Key::from_json(resolve(record, p)?)).collect();
                keys.map(Key::Array)
            }
        }
    }
}

/// Walk a dotted path through nested JSON objects.
fn resolve<'a>(record: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    let mut current = record;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}
