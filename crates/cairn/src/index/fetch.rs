//! Query execution: compiled scans into ordered logical index entries.
//!
//! One row is one record, but not necessarily one index entry: a multi-entry
//! row's packed composite expands into one entry per distinct element that
//! falls inside the query's range. [`execute`] runs the compiled scan,
//! expands rows into [`Hit`]s, applies the exact range re-check (the
//! authoritative filter behind the coarse scan prefilter), and returns them
//! in `(key, primary key)` order for the requested direction.

use cairn_core::encoding::composite::decode_key_set;
use cairn_core::{Key, KeyRange};
use cairn_store::{Direction, StoreTx};

use crate::error::EngineResult;
use crate::index::query::CompiledQuery;

/// One logical index entry produced by a query.
#[derive(Debug, Clone)]
pub struct Hit {
    /// The index key of this entry (one element, for multi-entry rows).
    pub key: Key,
    /// The owning record's encoded primary key.
    pub primary_key: Vec<u8>,
    /// The owning record's stored payload, if the row carried one.
    pub value: Option<Vec<u8>>,
}

/// Execute a compiled query and return its ordered hits.
///
/// `limit` caps logical entries, not rows; a single multi-entry row can
/// satisfy a limit greater than one on its own.
pub fn execute(
    store: &dyn StoreTx,
    table: &str,
    value_column: &str,
    compiled: &CompiledQuery,
    direction: Direction,
    limit: Option<usize>,
) -> EngineResult<Vec<Hit>> {
    let rows = store.scan(table, &compiled.scan)?;

    let mut hits = Vec::new();
    for row in rows {
        let Some(cell) = row.cell(&compiled.column) else {
            continue;
        };
        let value = row.cell(value_column).map(<[u8]>::to_vec);

        if compiled.multi_entry {
            // The packed set is already distinct, so duplicates within one
            // record contribute one entry each.
            for element in decode_key_set(cell)? {
                if in_range(&compiled.range, &element) {
                    hits.push(Hit {
                        key: element,
                        primary_key: row.primary_key.clone(),
                        value: value.clone(),
                    });
                }
            }
        } else {
            let key = Key::decode(cell)?;
            if in_range(&compiled.range, &key) {
                hits.push(Hit {
                    key,
                    primary_key: row.primary_key.clone(),
                    value,
                });
            }
        }
    }

    hits.sort_by(|a, b| {
        a.key
            .cmp(&b.key)
            .then_with(|| a.primary_key.cmp(&b.primary_key))
    });
    if direction == Direction::Reverse {
        hits.reverse();
    }
    if let Some(limit) = limit {
        hits.truncate(limit);
    }
    Ok(hits)
}

fn in_range(range: &Option<KeyRange>, key: &Key) -> bool {
    match range {
        Some(range) => range.contains(key),
        None => true,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cairn_core::encoding::composite::encode_key_set;
    use cairn_store::backends::MemoryStore;
    use cairn_store::Row;

    use super::*;
    use crate::index::query::{compile, QueryOptions};

    const VALUE: &str = "value";
    const IDX: &str = "idx";

    /// A table with one plain-encoded index column.
    fn plain_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store
            .create_table("t", &[VALUE.to_string(), IDX.to_string()])
            .unwrap();
        for (pk, key) in [(1u8, 30.0), (2, 10.0), (3, 20.0)] {
            store
                .insert(
                    "t",
                    Row::new(vec![pk])
                        .with_cell(VALUE, Some(vec![pk]))
                        .with_cell(IDX, Some(Key::Number(key).encode().unwrap())),
                )
                .unwrap();
        }
        store
    }

    /// A table whose index column packs composite key sets.
    fn multi_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store
            .create_table("t", &[VALUE.to_string(), IDX.to_string()])
            .unwrap();
        let sets: [(u8, Key); 2] = [
            (
                1,
                Key::Array(vec![Key::String("x".into()), Key::String("y".into())]),
            ),
            (2, Key::String("y".into())),
        ];
        for (pk, key) in sets {
            store
                .insert(
                    "t",
                    Row::new(vec![pk])
                        .with_cell(VALUE, Some(vec![pk]))
                        .with_cell(IDX, Some(encode_key_set(&key).unwrap())),
                )
                .unwrap();
        }
        store
    }

    #[test]
    fn hits_come_back_in_key_order() {
        let store = plain_store();
        let compiled = compile(IDX, false, None, QueryOptions::default()).unwrap();
        let hits = execute(&store, "t", VALUE, &compiled, Direction::Forward, None).unwrap();

        let keys: Vec<&Key> = hits.iter().map(|h| &h.key).collect();
        assert_eq!(
            keys,
            vec![&Key::Number(10.0), &Key::Number(20.0), &Key::Number(30.0)]
        );

        let hits = execute(&store, "t", VALUE, &compiled, Direction::Reverse, None).unwrap();
        assert_eq!(hits[0].key, Key::Number(30.0));
    }

    #[test]
    fn limit_caps_logical_entries() {
        let store = plain_store();
        let compiled = compile(IDX, false, None, QueryOptions::default()).unwrap();
        let hits = execute(&store, "t", VALUE, &compiled, Direction::Forward, Some(2)).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[1].key, Key::Number(20.0));
    }

    #[test]
    fn range_bounds_are_honored() {
        let store = plain_store();
        let range = KeyRange::bound(Key::Number(10.0), Key::Number(30.0), true, true);
        let compiled = compile(IDX, false, Some(&range), QueryOptions::default()).unwrap();
        let hits = execute(&store, "t", VALUE, &compiled, Direction::Forward, None).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].key, Key::Number(20.0));
    }

    #[test]
    fn multi_entry_rows_expand_per_element() {
        let store = multi_store();
        let compiled = compile(IDX, true, None, QueryOptions::default()).unwrap();
        let hits = execute(&store, "t", VALUE, &compiled, Direction::Forward, None).unwrap();

        // x(pk1), y(pk1), y(pk2) — element order, then primary-key order.
        let entries: Vec<(&Key, &[u8])> = hits
            .iter()
            .map(|h| (&h.key, h.primary_key.as_slice()))
            .collect();
        assert_eq!(
            entries,
            vec![
                (&Key::String("x".into()), [1u8].as_slice()),
                (&Key::String("y".into()), [1u8].as_slice()),
                (&Key::String("y".into()), [2u8].as_slice()),
            ]
        );
    }

    #[test]
    fn multi_entry_exact_lookup_matches_by_membership() {
        let store = multi_store();
        let range = KeyRange::only(Key::String("x".into()));
        let compiled = compile(IDX, true, Some(&range), QueryOptions::default()).unwrap();
        let hits = execute(&store, "t", VALUE, &compiled, Direction::Forward, None).unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].primary_key, vec![1]);
        assert_eq!(hits[0].value, Some(vec![1]));
    }

    #[test]
    fn unpopulated_rows_produce_no_hits() {
        let mut store = plain_store();
        store
            .insert(
                "t",
                Row::new(vec![9]).with_cell(VALUE, Some(vec![9])).with_cell(IDX, None),
            )
            .unwrap();
        let compiled = compile(IDX, false, None, QueryOptions::default()).unwrap();
        let hits = execute(&store, "t", VALUE, &compiled, Direction::Forward, None).unwrap();
        assert_eq!(hits.len(), 3);
    }
}
