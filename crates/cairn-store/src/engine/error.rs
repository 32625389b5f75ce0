//! Error types for store operations.

use thiserror::Error;

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the storage layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The named table does not exist.
    #[error("table not found: {0}")]
    TableNotFound(String),

    /// A table with this name already exists.
    #[error("table already exists: {0}")]
    TableExists(String),

    /// The named column does not exist on the table.
    #[error("column not found: {table}.{column}")]
    ColumnNotFound {
        /// The table that was addressed.
        table: String,
        /// The missing column.
        column: String,
    },

    /// A column with this name already exists on the table.
    #[error("column already exists: {table}.{column}")]
    ColumnExists {
        /// The table that was addressed.
        table: String,
        /// The duplicate column.
        column: String,
    },

    /// Stored bytes could not be interpreted.
    #[error("corrupt store data: {0}")]
    Corrupt(String),
}
