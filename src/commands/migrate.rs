// ABOUTME: Migrate command: copy every selected MySQL table into SQLite
// ABOUTME: Opens both connections, runs the row copier, then closes the source cleanly

use anyhow::{Context, Result};

use crate::config::MigrationConfig;
use crate::migration::{copy_database, MigrationSummary};
use crate::mysql::reader::MySqlSource;

/// Run a full migration described by `config`
///
/// # Examples
///
/// ```no_run
/// # use mysql_sqlite_migrator::config::{load_migration_config, ConfigOverrides};
/// # use mysql_sqlite_migrator::commands::migrate;
/// # async fn example() -> anyhow::Result<()> {
/// let config = load_migration_config(Some("migrate.toml"), ConfigOverrides::default())?;
/// let summary = migrate(&config).await?;
/// println!("Copied {} rows", summary.total_rows());
/// # Ok(())
/// # }
/// ```
pub async fn migrate(config: &MigrationConfig) -> Result<MigrationSummary> {
    let conn = crate::mysql::connect_mysql(&config.source_url)
        .await
        .context("Failed to connect to MariaDB/MySQL source")?;
    let mut source = MySqlSource::new(conn, config.source_database.clone());

    let mut dest = crate::sqlite::open_sqlite_destination(&config.destination_path)
        .context("Failed to connect to SQLite destination")?;

    let summary = copy_database(&mut source, &mut dest, &config.filter).await?;

    source.disconnect().await?;
    dest.close()
        .map_err(|(_, e)| e)
        .context("Failed to close SQLite database")?;

    Ok(summary)
}
