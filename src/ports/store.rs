//! Data store port for reading monitored tables.

use serde_json::{Map, Value};

use crate::error::StoreError;

/// Rows of one table, each a column-name → value object in column order.
pub type TableRows = Vec<Map<String, Value>>;

/// Opens connections to the monitored data store.
///
/// Opening is separate from reading so that "store unreachable" (skip the
/// cycle) and "table unreadable" (mark one table unknown) stay distinct.
pub trait DataStore: Send + Sync {
    /// Opens a read-only connection for one poll cycle.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unreachable`] if the store cannot be opened.
    fn connect(&self) -> Result<Box<dyn StoreConnection>, StoreError>;
}

/// A live, read-only connection.
pub trait StoreConnection {
    /// Reads every row of `table`, ordered by `id` ascending.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TableRead`] if the query fails.
    fn read_table(&self, table: &str) -> Result<TableRows, StoreError>;
}
