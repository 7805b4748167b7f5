// ABOUTME: Validate command: preflight checks without writing anything
// ABOUTME: Confirms every selected source table has a destination table with matching columns

use anyhow::{bail, Context, Result};
use rusqlite::Connection;

use crate::config::MigrationConfig;
use crate::filters::TableFilter;
use crate::migration::SourceDatabase;
use crate::mysql::reader::MySqlSource;

/// Check the destination schema against the selected source tables
///
/// Returns one human-readable line per problem; an empty list means every
/// table can be copied.
pub async fn check_destination_tables<S: SourceDatabase>(
    source: &mut S,
    dest: &Connection,
    filter: &TableFilter,
) -> Result<Vec<String>> {
    let tables = source
        .list_tables()
        .await
        .context("Failed to get tables from MySQL")?;
    let tables = filter.apply(tables)?;

    let mut problems = Vec::new();
    for table_name in &tables {
        let table = source.describe_table(table_name).await?;
        let dest_columns = crate::sqlite::table_columns(dest, table_name)?;

        if dest_columns.is_empty() {
            problems.push(format!(
                "Table '{}' does not exist in the SQLite destination",
                table_name
            ));
            continue;
        }

        for column in &table.columns {
            // SQLite resolves column names case-insensitively
            if !dest_columns
                .iter()
                .any(|c| c.eq_ignore_ascii_case(&column.name))
            {
                problems.push(format!(
                    "Column '{}.{}' ({}) does not exist in the SQLite destination",
                    table_name,
                    column.name,
                    column.logical_type()
                ));
            }
        }

        tracing::debug!("Checked table '{}'", table_name);
    }

    tracing::info!(
        "Checked {} table(s), found {} problem(s)",
        tables.len(),
        problems.len()
    );

    Ok(problems)
}

/// Connect to both databases and verify the destination schema
pub async fn validate(config: &MigrationConfig) -> Result<()> {
    let conn = crate::mysql::connect_mysql(&config.source_url)
        .await
        .context("Failed to connect to MariaDB/MySQL source")?;
    let mut source = MySqlSource::new(conn, config.source_database.clone());

    let dest = crate::sqlite::open_sqlite_destination(&config.destination_path)
        .context("Failed to connect to SQLite destination")?;

    let problems = check_destination_tables(&mut source, &dest, &config.filter).await?;
    source.disconnect().await?;

    if !problems.is_empty() {
        for problem in &problems {
            tracing::error!("{}", problem);
        }
        bail!(
            "Validation failed with {} problem(s); the destination schema must exist before migrating",
            problems.len()
        );
    }

    tracing::info!("Validation passed: source and destination are ready for migration");

    Ok(())
}
