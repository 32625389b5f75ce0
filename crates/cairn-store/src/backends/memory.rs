//! In-memory store backend.
//!
//! Reference implementation of [`StoreTx`] over `BTreeMap`s. Rows live in
//! primary-key order; named orderings are tracked as bookkeeping only, since
//! scans over in-memory maps sort explicitly. Used by the engine's tests and
//! as the executable definition of the store contract.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::engine::{
    Direction, Row, ScanQuery, StoreError, StoreResult, StoreTx, PRIMARY_ORDERING,
};

/// One table: declared columns, orderings, and rows keyed by primary key.
///
/// `BTreeMap` keeps rows in primary-key order for free; `primary_ordering`
/// only tracks whether the implicit ordering is nominally present so the
/// drop-then-recreate dance around table swaps behaves like a real backend.
#[derive(Debug, Clone, Default)]
struct Table {
    columns: Vec<String>,
    orderings: BTreeSet<String>,
    primary_ordering: bool,
    rows: BTreeMap<Vec<u8>, BTreeMap<String, Option<Vec<u8>>>>,
}

impl Table {
    fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}

/// In-memory implementation of [`StoreTx`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: BTreeMap<String, Table>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, name: &str) -> StoreResult<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| StoreError::TableNotFound(name.to_string()))
    }

    fn table_mut(&mut self, name: &str) -> StoreResult<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| StoreError::TableNotFound(name.to_string()))
    }
}

/// Sort key for `order_by`: null cells first, then cell bytes, then primary
/// key as tie-breaker.
fn order_cell<'a>(row: &'a Row, column: &str) -> (bool, Option<&'a [u8]>, &'a [u8]) {
    let cell = row.cell(column);
    (cell.is_some(), cell, row.primary_key.as_slice())
}

impl StoreTx for MemoryStore {
    fn create_table(&mut self, table: &str, columns: &[String]) -> StoreResult<()> {
        if self.tables.contains_key(table) {
            return Err(StoreError::TableExists(table.to_string()));
        }
        self.tables.insert(
            table.to_string(),
            Table {
                columns: columns.to_vec(),
                orderings: BTreeSet::new(),
                primary_ordering: true,
                rows: BTreeMap::new(),
            },
        );
        Ok(())
    }

    fn drop_table(&mut self, table: &str) -> StoreResult<()> {
        self.tables
            .remove(table)
            .map(|_| ())
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))
    }

    fn rename_table(&mut self, from: &str, to: &str) -> StoreResult<()> {
        if self.tables.contains_key(to) {
            return Err(StoreError::TableExists(to.to_string()));
        }
        let table = self
            .tables
            .remove(from)
            .ok_or_else(|| StoreError::TableNotFound(from.to_string()))?;
        self.tables.insert(to.to_string(), table);
        Ok(())
    }

    fn table_exists(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    fn columns(&self, table: &str) -> StoreResult<Vec<String>> {
        Ok(self.table(table)?.columns.clone())
    }

    fn add_column(&mut self, table: &str, column: &str) -> StoreResult<()> {
        let name = table.to_string();
        let t = self.table_mut(table)?;
        if t.has_column(column) {
            return Err(StoreError::ColumnExists {
                table: name,
                column: column.to_string(),
            });
        }
        t.columns.push(column.to_string());
        Ok(())
    }

    fn create_ordering(&mut self, table: &str, column: &str) -> StoreResult<()> {
        let name = table.to_string();
        let t = self.table_mut(table)?;
        if column == PRIMARY_ORDERING {
            t.primary_ordering = true;
            return Ok(());
        }
        if !t.has_column(column) {
            return Err(StoreError::ColumnNotFound {
                table: name,
                column: column.to_string(),
            });
        }
        t.orderings.insert(column.to_string());
        Ok(())
    }

    fn drop_ordering(&mut self, table: &str, column: &str) -> StoreResult<()> {
        let t = self.table_mut(table)?;
        if column == PRIMARY_ORDERING {
            t.primary_ordering = false;
        } else {
            t.orderings.remove(column);
        }
        Ok(())
    }

    fn has_ordering(&self, table: &str, column: &str) -> bool {
        self.tables.get(table).is_some_and(|t| {
            if column == PRIMARY_ORDERING {
                t.primary_ordering
            } else {
                t.orderings.contains(column)
            }
        })
    }

    fn insert(&mut self, table: &str, row: Row) -> StoreResult<()> {
        let name = table.to_string();
        let t = self.table_mut(table)?;
        for column in row.cells.keys() {
            if !t.has_column(column) {
                return Err(StoreError::ColumnNotFound {
                    table: name,
                    column: column.clone(),
                });
            }
        }
        t.rows.insert(row.primary_key, row.cells);
        Ok(())
    }

    fn get(&self, table: &str, primary_key: &[u8]) -> StoreResult<Option<Row>> {
        Ok(self.table(table)?.rows.get(primary_key).map(|cells| Row {
            primary_key: primary_key.to_vec(),
            cells: cells.clone(),
        }))
    }

    fn delete(&mut self, table: &str, primary_key: &[u8]) -> StoreResult<bool> {
        Ok(self.table_mut(table)?.rows.remove(primary_key).is_some())
    }

    fn scan(&self, table: &str, query: &ScanQuery) -> StoreResult<Vec<Row>> {
        let t = self.table(table)?;
        let mut rows: Vec<Row> = t
            .rows
            .iter()
            .map(|(pk, cells)| Row {
                primary_key: pk.clone(),
                cells: cells.clone(),
            })
            .filter(|row| query.matches(row))
            .collect();

        if let Some((column, direction)) = &query.order_by {
            rows.sort_by(|a, b| {
                let ord = order_cell(a, column).cmp(&order_cell(b, column));
                match direction {
                    Direction::Forward => ord,
                    Direction::Reverse => ord.reverse(),
                }
            });
        } else {
            // BTreeMap iteration already gave primary-key order.
            debug_assert!(rows
                .windows(2)
                .all(|w| w[0].primary_key.cmp(&w[1].primary_key) == Ordering::Less));
        }

        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    fn copy_projection(
        &mut self,
        src: &str,
        dst: &str,
        mapping: &[(String, String)],
    ) -> StoreResult<()> {
        let src_table = self.table(src)?.clone();
        for (from, _) in mapping {
            if !src_table.has_column(from) {
                return Err(StoreError::ColumnNotFound {
                    table: src.to_string(),
                    column: from.clone(),
                });
            }
        }

        let dst_name = dst.to_string();
        let dst_table = self.table_mut(dst)?;
        for (_, to) in mapping {
            if !dst_table.has_column(to) {
                return Err(StoreError::ColumnNotFound {
                    table: dst_name,
                    column: to.clone(),
                });
            }
        }

        for (pk, cells) in &src_table.rows {
            let mut projected = BTreeMap::new();
            for (from, to) in mapping {
                projected.insert(to.clone(), cells.get(from).cloned().flatten());
            }
            dst_table.rows.insert(pk.clone(), projected);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::engine::{CompareOp, Predicate};

    fn seeded() -> MemoryStore {
        let mut store = MemoryStore::new();
        store
            .create_table("t", &["a".to_string(), "b".to_string()])
            .unwrap();
        store
            .insert(
                "t",
                Row::new(b"p1".to_vec())
                    .with_cell("a", Some(b"beta".to_vec()))
                    .with_cell("b", Some(b"1".to_vec())),
            )
            .unwrap();
        store
            .insert(
                "t",
                Row::new(b"p2".to_vec())
                    .with_cell("a", Some(b"alpha".to_vec()))
                    .with_cell("b", None),
            )
            .unwrap();
        store
            .insert(
                "t",
                Row::new(b"p3".to_vec())
                    .with_cell("a", Some(b"gamma".to_vec()))
                    .with_cell("b", Some(b"3".to_vec())),
            )
            .unwrap();
        store
    }

    // ========================================================================
    // Structural operations
    // ========================================================================

    #[test]
    fn create_and_drop_table() {
        let mut store = MemoryStore::new();
        store.create_table("t", &[]).unwrap();
        assert!(store.table_exists("t"));
        assert_eq!(
            store.create_table("t", &[]),
            Err(StoreError::TableExists("t".to_string()))
        );
        store.drop_table("t").unwrap();
        assert!(!store.table_exists("t"));
        assert_eq!(
            store.drop_table("t"),
            Err(StoreError::TableNotFound("t".to_string()))
        );
    }

    #[test]
    fn rename_table_moves_rows() {
        let mut store = seeded();
        store.rename_table("t", "u").unwrap();
        assert!(!store.table_exists("t"));
        assert!(store.get("u", b"p1").unwrap().is_some());
    }

    #[test]
    fn rename_table_refuses_occupied_target() {
        let mut store = seeded();
        store.create_table("u", &[]).unwrap();
        assert_eq!(
            store.rename_table("t", "u"),
            Err(StoreError::TableExists("u".to_string()))
        );
    }

    #[test]
    fn add_column_reads_null_on_existing_rows() {
        let mut store = seeded();
        store.add_column("t", "c").unwrap();
        let row = store.get("t", b"p1").unwrap().unwrap();
        assert_eq!(row.cell("c"), None);
        assert_eq!(
            store.add_column("t", "a"),
            Err(StoreError::ColumnExists {
                table: "t".to_string(),
                column: "a".to_string()
            })
        );
    }

    #[test]
    fn primary_ordering_can_be_dropped_and_recreated() {
        let mut store = seeded();
        assert!(store.has_ordering("t", PRIMARY_ORDERING));
        store.drop_ordering("t", PRIMARY_ORDERING).unwrap();
        assert!(!store.has_ordering("t", PRIMARY_ORDERING));
        store.create_ordering("t", PRIMARY_ORDERING).unwrap();
        assert!(store.has_ordering("t", PRIMARY_ORDERING));
    }

    #[test]
    fn orderings_are_tracked_per_column() {
        let mut store = seeded();
        assert!(!store.has_ordering("t", "a"));
        store.create_ordering("t", "a").unwrap();
        assert!(store.has_ordering("t", "a"));
        store.drop_ordering("t", "a").unwrap();
        assert!(!store.has_ordering("t", "a"));

        assert_eq!(
            store.create_ordering("t", "nope"),
            Err(StoreError::ColumnNotFound {
                table: "t".to_string(),
                column: "nope".to_string()
            })
        );
    }

    // ========================================================================
    // Row operations
    // ========================================================================

    #[test]
    fn insert_is_upsert() {
        let mut store = seeded();
        store
            .insert(
                "t",
                Row::new(b"p1".to_vec()).with_cell("a", Some(b"replaced".to_vec())),
            )
            .unwrap();
        let row = store.get("t", b"p1").unwrap().unwrap();
        assert_eq!(row.cell("a"), Some(b"replaced".as_slice()));
        // Cells absent from the replacement read as null.
        assert_eq!(row.cell("b"), None);
    }

    #[test]
    fn insert_rejects_unknown_column() {
        let mut store = seeded();
        let err = store
            .insert("t", Row::new(b"px".to_vec()).with_cell("zz", None))
            .unwrap_err();
        assert!(matches!(err, StoreError::ColumnNotFound { .. }));
    }

    #[test]
    fn delete_reports_existence() {
        let mut store = seeded();
        assert!(store.delete("t", b"p1").unwrap());
        assert!(!store.delete("t", b"p1").unwrap());
    }

    // ========================================================================
    // Scans
    // ========================================================================

    #[test]
    fn scan_defaults_to_primary_key_order() {
        let store = seeded();
        let rows = store.scan("t", &ScanQuery::new()).unwrap();
        let pks: Vec<&[u8]> = rows.iter().map(|r| r.primary_key.as_slice()).collect();
        assert_eq!(pks, vec![b"p1".as_slice(), b"p2", b"p3"]);
    }

    #[test]
    fn scan_filters_and_orders_by_cell_bytes() {
        let store = seeded();
        let query = ScanQuery::new()
            .with_predicate(Predicate::IsNotNull {
                column: "a".to_string(),
            })
            .order_by("a", Direction::Forward);
        let rows = store.scan("t", &query).unwrap();
        let cells: Vec<&[u8]> = rows.iter().filter_map(|r| r.cell("a")).collect();
        assert_eq!(cells, vec![b"alpha".as_slice(), b"beta", b"gamma"]);

        let query = ScanQuery::new().order_by("a", Direction::Reverse);
        let rows = store.scan("t", &query).unwrap();
        assert_eq!(rows[0].cell("a"), Some(b"gamma".as_slice()));
    }

    #[test]
    fn scan_null_cells_fail_compare_predicates() {
        let store = seeded();
        let query = ScanQuery::new().with_predicate(Predicate::Compare {
            column: "b".to_string(),
            op: CompareOp::Ge,
            value: vec![],
        });
        let rows = store.scan("t", &query).unwrap();
        // p2 has a null "b" cell and must not match even a vacuous bound.
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.primary_key != b"p2".to_vec()));
    }

    #[test]
    fn scan_limit_applies_after_ordering() {
        let store = seeded();
        let query = ScanQuery::new().order_by("a", Direction::Forward).limit(1);
        let rows = store.scan("t", &query).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cell("a"), Some(b"alpha".as_slice()));
    }

    // ========================================================================
    // Projection copy
    // ========================================================================

    #[test]
    fn copy_projection_maps_columns() {
        let mut store = seeded();
        store
            .create_table("u", &["x".to_string(), "b".to_string()])
            .unwrap();
        store
            .copy_projection(
                "t",
                "u",
                &[
                    ("a".to_string(), "x".to_string()),
                    ("b".to_string(), "b".to_string()),
                ],
            )
            .unwrap();

        let row = store.get("u", b"p1").unwrap().unwrap();
        assert_eq!(row.cell("x"), Some(b"beta".as_slice()));
        assert_eq!(row.cell("b"), Some(b"1".as_slice()));
        // Null source cells stay null through the copy.
        let row = store.get("u", b"p2").unwrap().unwrap();
        assert_eq!(row.cell("b"), None);
        // Source table is untouched.
        assert_eq!(store.scan("t", &ScanQuery::new()).unwrap().len(), 3);
    }

    #[test]
    fn copy_projection_validates_both_sides() {
        let mut store = seeded();
        store.create_table("u", &["x".to_string()]).unwrap();
        let err = store
            .copy_projection("t", "u", &[("nope".to_string(), "x".to_string())])
            .unwrap_err();
        assert!(matches!(err, StoreError::ColumnNotFound { .. }));
        let err = store
            .copy_projection("t", "u", &[("a".to_string(), "nope".to_string())])
            .unwrap_err();
        assert!(matches!(err, StoreError::ColumnNotFound { .. }));
    }
}
