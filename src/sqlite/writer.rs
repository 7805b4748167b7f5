// ABOUTME: Per-table SQLite write transaction for the row copier
// ABOUTME: Clears the table, reuses one prepared INSERT OR REPLACE, commits or rolls back as a unit

use anyhow::{bail, Context, Result};
use mysql_async::Value;
use rusqlite::{params_from_iter, Connection, Transaction, TransactionBehavior};

use crate::migration::TableDescriptor;
use crate::utils::quote_sqlite_identifier;

/// A progress line is logged every this many rows
pub const PROGRESS_INTERVAL: u64 = 1000;

/// Build `DELETE FROM "table"`
pub fn build_delete_query(table: &TableDescriptor) -> String {
    format!("DELETE FROM {}", quote_sqlite_identifier(&table.name))
}

/// Build `INSERT OR REPLACE INTO "table" ("a", "b") VALUES (?1, ?2)`
///
/// Column order is the descriptor's order, the same order the source SELECT uses.
///
/// # Examples
///
/// ```
/// # use mysql_sqlite_migrator::migration::TableDescriptor;
/// # use mysql_sqlite_migrator::sqlite::writer::build_insert_query;
/// let table = TableDescriptor::from_catalog("entry", vec![("id", "int"), ("title", "varchar")]);
/// assert_eq!(
///     build_insert_query(&table),
///     "INSERT OR REPLACE INTO \"entry\" (\"id\", \"title\") VALUES (?1, ?2)"
/// );
/// ```
pub fn build_insert_query(table: &TableDescriptor) -> String {
    let columns: Vec<String> = table
        .columns
        .iter()
        .map(|c| quote_sqlite_identifier(&c.name))
        .collect();
    let placeholders: Vec<String> = (1..=table.columns.len()).map(|i| format!("?{}", i)).collect();

    format!(
        "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
        quote_sqlite_identifier(&table.name),
        columns.join(", "),
        placeholders.join(", ")
    )
}

/// Scoped write transaction for one destination table
///
/// [`TableWriter::begin`] opens the transaction and deletes every existing
/// row. Rows are written through a single cached prepared statement. Only
/// [`TableWriter::commit`] makes anything visible; dropping the writer on an
/// error path or during unwinding rolls the whole table back.
pub struct TableWriter<'a> {
    tx: Transaction<'a>,
    table: &'a TableDescriptor,
    insert_sql: String,
    rows_written: u64,
}

impl<'a> TableWriter<'a> {
    pub fn begin(conn: &'a mut Connection, table: &'a TableDescriptor) -> Result<Self> {
        if table.columns.is_empty() {
            bail!("Table '{}' has no columns to copy", table.name);
        }

        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .with_context(|| {
                format!("Failed to begin SQLite transaction for '{}'", table.name)
            })?;

        let delete_sql = build_delete_query(table);
        let deleted = tx
            .execute(&delete_sql, [])
            .with_context(|| format!("Failed to clear SQLite table '{}'", table.name))?;
        tracing::debug!("Deleted {} existing row(s) from '{}'", deleted, table.name);

        let insert_sql = build_insert_query(table);
        tracing::debug!("Insert statement for '{}': {}", table.name, insert_sql);

        // Compile once up front so a schema mismatch fails before any row is read
        tx.prepare_cached(&insert_sql).with_context(|| {
            format!(
                "Failed to prepare SQLite insert statement for '{}'",
                table.name
            )
        })?;

        Ok(Self {
            tx,
            table,
            insert_sql,
            rows_written: 0,
        })
    }

    /// Coerce one source row and insert it
    pub fn write_row(&mut self, row: Vec<Value>) -> Result<()> {
        let record = self.rows_written + 1;

        if row.len() != self.table.columns.len() {
            bail!(
                "Record {} in table '{}' has {} value(s), expected {}",
                record,
                self.table.name,
                row.len(),
                self.table.columns.len()
            );
        }

        let values = row
            .into_iter()
            .zip(&self.table.columns)
            .map(|(value, column)| {
                column.rule.coerce(value).with_context(|| {
                    format!(
                        "Failed to convert column '{}' in table '{}' (record {})",
                        column.name, self.table.name, record
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?;

        {
            let mut stmt = self.tx.prepare_cached(&self.insert_sql).with_context(|| {
                format!(
                    "Failed to prepare SQLite insert statement for '{}'",
                    self.table.name
                )
            })?;
            stmt.execute(params_from_iter(values)).with_context(|| {
                format!(
                    "Failed to insert record {} into SQLite table '{}'",
                    record, self.table.name
                )
            })?;
        }

        self.rows_written = record;
        if self.rows_written % PROGRESS_INTERVAL == 0 {
            tracing::info!(
                "Migrated {} records in table '{}'...",
                self.rows_written,
                self.table.name
            );
        }

        Ok(())
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Commit the table and return the number of rows written
    pub fn commit(self) -> Result<u64> {
        let rows = self.rows_written;
        let table = self.table;
        self.tx.commit().with_context(|| {
            format!("Failed to commit SQLite transaction for '{}'", table.name)
        })?;
        Ok(rows)
    }

    /// Discard everything written for this table, including the initial delete
    pub fn rollback(self) -> Result<()> {
        let table = self.table;
        tracing::warn!(
            "Rolling back table '{}' after {} record(s)",
            table.name,
            self.rows_written
        );
        self.tx.rollback().with_context(|| {
            format!("Failed to roll back SQLite transaction for '{}'", table.name)
        })
    }
}
