// ABOUTME: SQLite destination access for MySQL-to-SQLite migration
// ABOUTME: Provides file path validation, read-write connections, and pragma helpers

pub mod writer;

use anyhow::{bail, Context, Result};
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};

/// Validate a SQLite destination file path
///
/// Security checks:
/// - Canonicalizes path to resolve symlinks and relative paths
/// - Verifies file exists and is a regular file (not directory)
/// - Checks file extension is .db, .sqlite, or .sqlite3
///
/// The destination schema must already exist, so a missing file is an error
/// rather than something to create.
///
/// # Arguments
///
/// * `path` - Path to SQLite file (can be relative or absolute)
///
/// # Returns
///
/// Canonicalized absolute path if valid, error otherwise
///
/// # Examples
///
/// ```no_run
/// # use mysql_sqlite_migrator::sqlite::validate_sqlite_path;
/// assert!(validate_sqlite_path("wallabag.sqlite").is_ok());
/// assert!(validate_sqlite_path("/nonexistent.db").is_err());
/// ```
pub fn validate_sqlite_path(path: &str) -> Result<PathBuf> {
    if path.is_empty() {
        bail!("SQLite file path cannot be empty");
    }

    let path_buf = PathBuf::from(path);

    // Canonicalize to resolve symlinks and relative paths
    // This also validates that the file exists
    let canonical = path_buf.canonicalize().with_context(|| {
        format!(
            "Failed to resolve SQLite file path '{}'. \
             File may not exist or may not be readable.",
            path
        )
    })?;

    if !canonical.is_file() {
        bail!("Path '{}' is not a regular file (may be a directory)", path);
    }

    if let Some(ext) = canonical.extension() {
        let ext_str = ext.to_str().unwrap_or("");
        if !["db", "sqlite", "sqlite3"].contains(&ext_str) {
            bail!(
                "Invalid SQLite file extension '{}'. \
                 Must be .db, .sqlite, or .sqlite3",
                ext_str
            );
        }
    } else {
        bail!(
            "SQLite file '{}' has no extension. \
             Must be .db, .sqlite, or .sqlite3",
            path
        );
    }

    tracing::debug!("Validated SQLite path: {}", canonical.display());

    Ok(canonical)
}

/// Open an existing SQLite database for writing
///
/// Opens read-write without the create flag, then runs a trivial query to
/// make sure the file really is a SQLite database.
///
/// # Examples
///
/// ```no_run
/// # use mysql_sqlite_migrator::sqlite::open_sqlite_destination;
/// # fn example() -> anyhow::Result<()> {
/// let conn = open_sqlite_destination(std::path::Path::new("wallabag.sqlite"))?;
/// # Ok(())
/// # }
/// ```
pub fn open_sqlite_destination(path: &Path) -> Result<Connection> {
    tracing::info!("Opening SQLite database: {}", path.display());

    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("Failed to open SQLite database: {}", path.display()))?;

    let version: String = conn
        .query_row("SELECT sqlite_version()", [], |row| row.get(0))
        .context("Failed to query SQLite version (database may be corrupted)")?;

    tracing::info!("Successfully connected to SQLite {}", version);

    Ok(conn)
}

/// Turn foreign-key enforcement on or off for this connection
///
/// SQLite ignores this pragma inside a transaction, so call it between tables.
pub fn set_foreign_keys(conn: &Connection, enabled: bool) -> Result<()> {
    let sql = if enabled {
        "PRAGMA foreign_keys = ON;"
    } else {
        "PRAGMA foreign_keys = OFF;"
    };

    conn.execute_batch(sql).with_context(|| {
        format!(
            "Failed to {} SQLite foreign keys",
            if enabled { "re-enable" } else { "disable" }
        )
    })?;

    Ok(())
}

/// Current foreign-key enforcement setting
pub fn foreign_keys_enabled(conn: &Connection) -> Result<bool> {
    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
        .context("Failed to read SQLite foreign key setting")?;
    Ok(enabled != 0)
}

/// Column names of a destination table, empty if the table does not exist
pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT name FROM pragma_table_info(?1)")
        .context("Failed to prepare table_info query")?;

    let columns = stmt
        .query_map([table], |row| row.get::<_, String>(0))
        .with_context(|| format!("Failed to read columns of SQLite table '{}'", table))?
        .collect::<Result<Vec<String>, _>>()
        .with_context(|| format!("Failed to collect columns of SQLite table '{}'", table))?;

    Ok(columns)
}
