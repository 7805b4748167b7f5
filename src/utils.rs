// ABOUTME: Identifier validation, quoting, and display helpers
// ABOUTME: Shared by the MySQL reader and the SQLite writer when building SQL

use anyhow::{bail, Result};

/// Longest identifier MySQL accepts for schemas, tables, and columns
const MAX_IDENTIFIER_LENGTH: usize = 64;

/// Validate a database, table, or column name before it is spliced into SQL
///
/// Names are always quoted when used (see [`quote_mysql_identifier`] and
/// [`quote_sqlite_identifier`]), so anything MySQL itself allows is accepted
/// here. Validation rejects only what neither engine can represent:
/// - Empty or whitespace-only names
/// - Names longer than 64 characters
/// - Control characters (including NUL)
///
/// # Examples
///
/// ```
/// # use mysql_sqlite_migrator::utils::validate_identifier;
/// assert!(validate_identifier("wallabag_entry").is_ok());
/// assert!(validate_identifier("user").is_ok());
/// assert!(validate_identifier("order items").is_ok());
///
/// assert!(validate_identifier("").is_err());
/// assert!(validate_identifier("bad\0name").is_err());
/// ```
pub fn validate_identifier(identifier: &str) -> Result<()> {
    if identifier.trim().is_empty() {
        bail!("Identifier cannot be empty or whitespace-only");
    }

    let length = identifier.chars().count();
    if length > MAX_IDENTIFIER_LENGTH {
        bail!(
            "Identifier '{}' exceeds maximum length of {} characters (got {})",
            sanitize_identifier(identifier),
            MAX_IDENTIFIER_LENGTH,
            length
        );
    }

    if let Some((position, c)) = identifier.chars().enumerate().find(|(_, c)| c.is_control()) {
        bail!(
            "Identifier '{}' contains control character \\x{:02x} at position {}",
            sanitize_identifier(identifier),
            c as u32,
            position
        );
    }

    Ok(())
}

/// Sanitize an identifier for display in logs and error messages
///
/// Removes control characters and limits length to 100 characters.
/// This is for display only; use the quoting helpers for SQL.
///
/// # Examples
///
/// ```
/// # use mysql_sqlite_migrator::utils::sanitize_identifier;
/// assert_eq!(sanitize_identifier("normal_table"), "normal_table");
/// assert_eq!(sanitize_identifier("table\x00name"), "tablename");
/// assert_eq!(sanitize_identifier(&"a".repeat(200)).len(), 100);
/// ```
pub fn sanitize_identifier(identifier: &str) -> String {
    identifier
        .chars()
        .filter(|c| !c.is_control())
        .take(100)
        .collect()
}

/// Quote an identifier for MySQL using backticks
///
/// Embedded backticks are doubled.
///
/// # Examples
///
/// ```
/// # use mysql_sqlite_migrator::utils::quote_mysql_identifier;
/// assert_eq!(quote_mysql_identifier("entry"), "`entry`");
/// assert_eq!(quote_mysql_identifier("we`ird"), "`we``ird`");
/// ```
pub fn quote_mysql_identifier(identifier: &str) -> String {
    format!("`{}`", identifier.replace('`', "``"))
}

/// Quote an identifier for SQLite using double quotes
///
/// Embedded double quotes are doubled.
///
/// # Examples
///
/// ```
/// # use mysql_sqlite_migrator::utils::quote_sqlite_identifier;
/// assert_eq!(quote_sqlite_identifier("entry"), "\"entry\"");
/// assert_eq!(quote_sqlite_identifier("we\"ird"), "\"we\"\"ird\"");
/// ```
pub fn quote_sqlite_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}
