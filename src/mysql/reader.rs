// ABOUTME: MySQL catalog introspection and streaming row reads
// ABOUTME: Implements the migration source over a single mysql_async connection

use anyhow::{bail, Context, Result};
use mysql_async::{prelude::*, Conn, Value};

use crate::migration::{SourceDatabase, TableDescriptor};
use crate::utils::quote_mysql_identifier;

/// List all base tables in a MySQL database
///
/// Views are excluded. Tables come back sorted by name, which is the
/// enumeration order the copier follows.
///
/// # Examples
///
/// ```no_run
/// # use mysql_sqlite_migrator::mysql::{connect_mysql, reader::list_tables};
/// # async fn example() -> anyhow::Result<()> {
/// let mut conn = connect_mysql("mysql://localhost:3306/wallabag").await?;
/// let tables = list_tables(&mut conn, "wallabag").await?;
/// println!("Found {} tables", tables.len());
/// # Ok(())
/// # }
/// ```
pub async fn list_tables(conn: &mut Conn, db_name: &str) -> Result<Vec<String>> {
    tracing::info!("Listing tables from MySQL database '{}'", db_name);

    let query = r#"
        SELECT TABLE_NAME
        FROM INFORMATION_SCHEMA.TABLES
        WHERE TABLE_SCHEMA = ?
        AND TABLE_TYPE = 'BASE TABLE'
        ORDER BY TABLE_NAME
    "#;

    let tables: Vec<String> = conn
        .exec(query, (db_name,))
        .await
        .with_context(|| format!("Failed to list tables from database '{}'", db_name))?;

    tracing::info!("Found {} table(s) in database '{}'", tables.len(), db_name);

    Ok(tables)
}

/// Get (column name, DATA_TYPE) pairs for a table in ordinal order
pub async fn get_column_types(
    conn: &mut Conn,
    db_name: &str,
    table_name: &str,
) -> Result<Vec<(String, String)>> {
    let query = r#"
        SELECT COLUMN_NAME, DATA_TYPE
        FROM INFORMATION_SCHEMA.COLUMNS
        WHERE TABLE_SCHEMA = ?
        AND TABLE_NAME = ?
        ORDER BY ORDINAL_POSITION
    "#;

    let columns: Vec<(String, String)> = conn
        .exec(query, (db_name, table_name))
        .await
        .with_context(|| {
            format!(
                "Failed to get column info for table '{}.{}'",
                db_name, table_name
            )
        })?;

    Ok(columns)
}

/// Build `SELECT `a`, `b` FROM `db`.`table``
///
/// # Examples
///
/// ```
/// # use mysql_sqlite_migrator::migration::TableDescriptor;
/// # use mysql_sqlite_migrator::mysql::reader::build_select_query;
/// let table = TableDescriptor::from_catalog("entry", vec![("id", "int"), ("title", "varchar")]);
/// assert_eq!(
///     build_select_query("wallabag", &table),
///     "SELECT `id`, `title` FROM `wallabag`.`entry`"
/// );
/// ```
pub fn build_select_query(db_name: &str, table: &TableDescriptor) -> String {
    let columns: Vec<String> = table
        .columns
        .iter()
        .map(|c| quote_mysql_identifier(&c.name))
        .collect();

    format!(
        "SELECT {} FROM {}.{}",
        columns.join(", "),
        quote_mysql_identifier(db_name),
        quote_mysql_identifier(&table.name)
    )
}

/// Migration source backed by one MySQL connection and one schema
pub struct MySqlSource {
    conn: Conn,
    db_name: String,
}

impl MySqlSource {
    pub fn new(conn: Conn, db_name: impl Into<String>) -> Self {
        Self {
            conn,
            db_name: db_name.into(),
        }
    }

    /// Close the connection cleanly
    pub async fn disconnect(self) -> Result<()> {
        self.conn
            .disconnect()
            .await
            .context("Failed to close MySQL connection")
    }
}

impl SourceDatabase for MySqlSource {
    async fn list_tables(&mut self) -> Result<Vec<String>> {
        list_tables(&mut self.conn, &self.db_name).await
    }

    async fn describe_table(&mut self, table: &str) -> Result<TableDescriptor> {
        let columns = get_column_types(&mut self.conn, &self.db_name, table).await?;

        if columns.is_empty() {
            bail!(
                "MySQL catalog reports no columns for table '{}.{}'",
                self.db_name,
                table
            );
        }

        tracing::debug!(
            "Table '{}' has {} columns: {:?}",
            table,
            columns.len(),
            columns
        );

        Ok(TableDescriptor::from_catalog(table, columns))
    }

    async fn stream_rows<F>(&mut self, table: &TableDescriptor, mut on_row: F) -> Result<()>
    where
        F: FnMut(Vec<Value>) -> Result<()>,
    {
        let query = build_select_query(&self.db_name, table);
        tracing::debug!("Select statement for '{}': {}", table.name, query);

        let mut result = self
            .conn
            .query_iter(query)
            .await
            .with_context(|| format!("Failed to query MySQL table '{}'", table.name))?;

        while let Some(row) = result
            .next()
            .await
            .with_context(|| format!("Error during row iteration for table '{}'", table.name))?
        {
            // Row::unwrap yields the column values (none have been taken yet)
            on_row(row.unwrap())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_select_query_keeps_catalog_order() {
        let table = TableDescriptor::from_catalog(
            "entry",
            vec![("url", "text"), ("id", "int"), ("created_at", "datetime")],
        );

        assert_eq!(
            build_select_query("wallabag", &table),
            "SELECT `url`, `id`, `created_at` FROM `wallabag`.`entry`"
        );
    }

    #[test]
    fn test_build_select_query_quotes_awkward_names() {
        let table = TableDescriptor::from_catalog("group`s", vec![("order", "int")]);

        assert_eq!(
            build_select_query("my db", &table),
            "SELECT `order` FROM `my db`.`group``s`"
        );
    }
}
