// ABOUTME: Row copier that moves every selected table from the source into SQLite
// ABOUTME: One destination transaction per table; the first failure stops the whole run

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::time::Instant;

use super::SourceDatabase;
use crate::filters::TableFilter;
use crate::sqlite::writer::TableWriter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSummary {
    pub name: String,
    pub rows: u64,
}

/// Outcome of a completed run, in copy order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationSummary {
    pub tables: Vec<TableSummary>,
}

impl MigrationSummary {
    pub fn total_rows(&self) -> u64 {
        self.tables.iter().map(|t| t.rows).sum()
    }
}

/// Copy one table, replacing the destination table's contents
///
/// The destination transaction commits only when every row made it in.
/// Any failure rolls back the delete and all inserts, leaving the destination
/// table exactly as it was.
pub async fn copy_table<S: SourceDatabase>(
    source: &mut S,
    dest: &mut Connection,
    table_name: &str,
) -> Result<u64> {
    let table = source
        .describe_table(table_name)
        .await
        .with_context(|| format!("Could not get column info for '{}'", table_name))?;

    let mut writer = TableWriter::begin(dest, &table)?;

    let streamed = source
        .stream_rows(&table, |row| writer.write_row(row))
        .await;

    match streamed {
        Ok(()) => {
            let rows = writer.commit()?;
            tracing::info!("Finished migrating {} records in table '{}'.", rows, table.name);
            Ok(rows)
        }
        Err(e) => {
            if let Err(rollback_err) = writer.rollback() {
                tracing::error!(
                    "Rollback of table '{}' failed: {:#}",
                    table.name,
                    rollback_err
                );
            }
            Err(e)
        }
    }
}

/// Copy every selected source table, in enumeration order
///
/// Foreign-key enforcement is switched off for the run and back on once all
/// tables have committed. A failing table aborts the run and leaves it off.
pub async fn copy_database<S: SourceDatabase>(
    source: &mut S,
    dest: &mut Connection,
    filter: &TableFilter,
) -> Result<MigrationSummary> {
    let started = Instant::now();

    crate::sqlite::set_foreign_keys(dest, false)?;
    tracing::info!("SQLite foreign key checks disabled for import.");

    let tables = source
        .list_tables()
        .await
        .context("Failed to get tables from MySQL")?;
    let tables = filter.apply(tables)?;

    let mut summary = MigrationSummary::default();
    for table_name in tables {
        tracing::info!("Migrating table '{}'...", table_name);

        let rows = copy_table(source, dest, &table_name)
            .await
            .with_context(|| format!("Error migrating table '{}'", table_name))?;

        tracing::info!("Successfully migrated table '{}'.", table_name);
        summary.tables.push(TableSummary {
            name: table_name,
            rows,
        });
    }

    crate::sqlite::set_foreign_keys(dest, true)?;
    tracing::info!("SQLite foreign key checks re-enabled.");

    tracing::info!(
        "Migration complete: {} table(s), {} record(s) in {:.1?}",
        summary.tables.len(),
        summary.total_rows(),
        started.elapsed()
    );

    Ok(summary)
}
