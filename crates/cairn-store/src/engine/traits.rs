//! Core store traits and scan types.
//!
//! [`StoreTx`] is the full contract a backend implements. It is deliberately
//! object-safe so the index engine can hold a `&mut dyn StoreTx` without
//! caring which backend is underneath.

use std::collections::BTreeMap;

use crate::engine::error::StoreResult;

/// Name of the implicit ordering every table carries on its primary key.
///
/// Backends create it automatically in [`StoreTx::create_table`]. It can be
/// addressed through [`StoreTx::drop_ordering`]/[`StoreTx::create_ordering`]
/// like any column ordering; table-swap procedures drop and recreate it so
/// backends that tie the structure to the table name stay consistent.
pub const PRIMARY_ORDERING: &str = "__primary";

/// A single stored row: a primary key plus named nullable byte cells.
///
/// Cells absent from the map read as null. The store never interprets cell
/// bytes; comparison semantics live entirely in how callers encode them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// The row's primary key bytes.
    pub primary_key: Vec<u8>,
    /// Named cells. `None` is an explicit null.
    pub cells: BTreeMap<String, Option<Vec<u8>>>,
}

impl Row {
    /// Create an empty row with the given primary key.
    #[must_use]
    pub const fn new(primary_key: Vec<u8>) -> Self {
        Self {
            primary_key,
            cells: BTreeMap::new(),
        }
    }

    /// Builder-style cell assignment.
    #[must_use]
    pub fn with_cell(mut self, column: &str, value: Option<Vec<u8>>) -> Self {
        self.cells.insert(column.to_string(), value);
        self
    }

    /// Read a cell, treating both absent and explicit-null cells as null.
    #[must_use]
    pub fn cell(&self, column: &str) -> Option<&[u8]> {
        match self.cells.get(column) {
            Some(Some(bytes)) => Some(bytes.as_slice()),
            _ => None,
        }
    }
}

/// Byte-comparison operators available in scan predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// Strictly less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Equal.
    Eq,
    /// Greater than or equal.
    Ge,
    /// Strictly greater than.
    Gt,
}

impl CompareOp {
    /// Evaluate the operator over raw bytes (lexicographic comparison).
    #[must_use]
    pub fn matches(self, cell: &[u8], value: &[u8]) -> bool {
        match self {
            Self::Lt => cell < value,
            Self::Le => cell <= value,
            Self::Eq => cell == value,
            Self::Ge => cell >= value,
            Self::Gt => cell > value,
        }
    }
}

/// A single scan predicate over one column.
///
/// Null cells fail every predicate except a disjunction with a branch that
/// matches them; there is no `IsNull` because the index engine never asks
/// for nulls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// The cell must be non-null.
    IsNotNull {
        /// Column to test.
        column: String,
    },
    /// The cell bytes must satisfy `op` against `value`.
    Compare {
        /// Column to test.
        column: String,
        /// Comparison operator.
        op: CompareOp,
        /// Right-hand operand bytes.
        value: Vec<u8>,
    },
    /// The cell bytes must contain `needle` as a contiguous substring.
    ///
    /// This is the store-level primitive behind the coarse multi-valued
    /// membership prefilter; it can over-match, so callers re-check exactly.
    Contains {
        /// Column to test.
        column: String,
        /// Byte substring to look for.
        needle: Vec<u8>,
    },
    /// At least one inner predicate must match.
    AnyOf(Vec<Predicate>),
}

impl Predicate {
    /// Evaluate the predicate against a row.
    #[must_use]
    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Self::IsNotNull { column } => row.cell(column).is_some(),
            Self::Compare { column, op, value } => {
                row.cell(column).is_some_and(|cell| op.matches(cell, value))
            }
            Self::Contains { column, needle } => row.cell(column).is_some_and(|cell| {
                needle.is_empty()
                    || cell.windows(needle.len()).any(|window| window == needle)
            }),
            Self::AnyOf(inner) => inner.iter().any(|p| p.matches(row)),
        }
    }
}

/// Scan ordering direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Ascending byte order.
    #[default]
    Forward,
    /// Descending byte order.
    Reverse,
}

/// A scan request: predicate conjunction, optional ordering, optional limit.
///
/// The limit applies after ordering. Ordering by a column sorts rows by that
/// column's cell bytes, with the primary key as tie-breaker; rows whose cell
/// is null sort before all non-null cells (predicates normally exclude them
/// first).
#[derive(Debug, Clone, Default)]
pub struct ScanQuery {
    /// Predicates, all of which must match.
    pub predicates: Vec<Predicate>,
    /// Ordering column and direction; `None` means primary-key order.
    pub order_by: Option<(String, Direction)>,
    /// Maximum number of rows to return.
    pub limit: Option<usize>,
}

impl ScanQuery {
    /// Create an unrestricted scan in primary-key order.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a predicate to the conjunction.
    #[must_use]
    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Order results by a column's cell bytes.
    #[must_use]
    pub fn order_by(mut self, column: &str, direction: Direction) -> Self {
        self.order_by = Some((column.to_string(), direction));
        self
    }

    /// Cap the number of rows returned.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a row satisfies every predicate.
    #[must_use]
    pub fn matches(&self, row: &Row) -> bool {
        self.predicates.iter().all(|p| p.matches(row))
    }
}

/// The store contract: row access plus the structural operations the index
/// engine's schema procedures are built from.
///
/// Implementations must apply structural operations immediately and visibly
/// to subsequent calls on the same handle; transactional scoping (and undo
/// on abort) is the caller's responsibility.
pub trait StoreTx {
    /// Create a table with the given non-key columns.
    ///
    /// The primary-key ordering is created implicitly. Fails with
    /// [`TableExists`](crate::StoreError::TableExists) if the name is taken.
    fn create_table(&mut self, table: &str, columns: &[String]) -> StoreResult<()>;

    /// Drop a table and everything in it.
    fn drop_table(&mut self, table: &str) -> StoreResult<()>;

    /// Rename a table. The target name must be free.
    fn rename_table(&mut self, from: &str, to: &str) -> StoreResult<()>;

    /// Whether a table exists.
    fn table_exists(&self, table: &str) -> bool;

    /// The table's non-key column names, in creation order.
    fn columns(&self, table: &str) -> StoreResult<Vec<String>>;

    /// Add a column to an existing table. Existing rows read null for it.
    fn add_column(&mut self, table: &str, column: &str) -> StoreResult<()>;

    /// Create a named ordering (byte-order accelerator) over one column.
    fn create_ordering(&mut self, table: &str, column: &str) -> StoreResult<()>;

    /// Drop a column's ordering. Row data is untouched.
    fn drop_ordering(&mut self, table: &str, column: &str) -> StoreResult<()>;

    /// Whether a column currently has an ordering.
    fn has_ordering(&self, table: &str, column: &str) -> bool;

    /// Insert or replace the row with this primary key.
    fn insert(&mut self, table: &str, row: Row) -> StoreResult<()>;

    /// Fetch one row by primary key.
    fn get(&self, table: &str, primary_key: &[u8]) -> StoreResult<Option<Row>>;

    /// Delete one row by primary key. Returns whether it existed.
    fn delete(&mut self, table: &str, primary_key: &[u8]) -> StoreResult<bool>;

    /// Run a scan and collect the matching rows.
    fn scan(&self, table: &str, query: &ScanQuery) -> StoreResult<Vec<Row>>;

    /// Bulk-copy every row of `src` into `dst`, mapping source columns to
    /// destination columns per `mapping`. Source columns absent from the
    /// mapping are dropped; destination columns absent from it read null.
    fn copy_projection(
        &mut self,
        src: &str,
        dst: &str,
        mapping: &[(String, String)],
    ) -> StoreResult<()>;
}
