// ABOUTME: Table and column descriptors plus the source-database seam
// ABOUTME: Everything the row copier needs to know about one source table

pub mod copier;

pub use copier::{copy_database, copy_table, MigrationSummary, TableSummary};

use anyhow::Result;
use mysql_async::Value;

use crate::mysql::converter::{CoercionRule, TypeFamily};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub rule: CoercionRule,
}

impl ColumnDescriptor {
    /// Build a descriptor from a catalog (name, DATA_TYPE) pair
    ///
    /// Unrecognized logical types are logged once here and scanned as text.
    pub fn new(name: impl Into<String>, logical_type: &str) -> Self {
        let name = name.into();
        let rule = CoercionRule::for_logical_type(logical_type);

        if rule.family() == TypeFamily::Unrecognized {
            tracing::warn!(
                "Unhandled MySQL type '{}' for column '{}', scanning as string",
                logical_type,
                crate::utils::sanitize_identifier(&name)
            );
        }

        Self { name, rule }
    }

    pub fn logical_type(&self) -> &str {
        self.rule.logical_type()
    }
}

/// Ordered column list of one table; the order is used for both SELECT and INSERT
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
}

impl TableDescriptor {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Build from catalog (column name, logical type) pairs in ordinal order
    pub fn from_catalog<N, T>(name: impl Into<String>, columns: Vec<(N, T)>) -> Self
    where
        N: Into<String>,
        T: AsRef<str>,
    {
        let columns = columns
            .into_iter()
            .map(|(column, logical_type)| ColumnDescriptor::new(column, logical_type.as_ref()))
            .collect();
        Self::new(name, columns)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Read side of a migration
///
/// Implemented by [`crate::mysql::reader::MySqlSource`] for live runs; tests
/// drive the copier through in-memory implementations.
#[allow(async_fn_in_trait)]
pub trait SourceDatabase {
    /// Table names in catalog enumeration order
    async fn list_tables(&mut self) -> Result<Vec<String>>;

    /// Column descriptors for a table, ordered by ordinal position
    async fn describe_table(&mut self, table: &str) -> Result<TableDescriptor>;

    /// Stream every row of `table`, one value per column in descriptor order
    ///
    /// Rows are handed to `on_row` as they arrive; the first error returned by
    /// `on_row` stops the stream and is propagated.
    async fn stream_rows<F>(&mut self, table: &TableDescriptor, on_row: F) -> Result<()>
    where
        F: FnMut(Vec<Value>) -> Result<()>;
}
