// ABOUTME: Loads and validates the migration configuration
// ABOUTME: Merges an optional TOML file with CLI overrides into one MigrationConfig

use crate::filters::TableFilter;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    source: SourceSection,
    #[serde(default)]
    destination: DestinationSection,
    #[serde(default)]
    tables: TablesSection,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SourceSection {
    url: Option<String>,
    database: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DestinationSection {
    path: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TablesSection {
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
}

/// Values given on the command line; each one wins over the config file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub source_url: Option<String>,
    pub source_database: Option<String>,
    pub destination_path: Option<String>,
    pub include_tables: Option<Vec<String>>,
    pub exclude_tables: Option<Vec<String>>,
}

/// Everything a run needs, validated before any database work begins
#[derive(Clone)]
pub struct MigrationConfig {
    pub source_url: String,
    pub source_database: String,
    pub destination_path: PathBuf,
    pub filter: TableFilter,
}

impl std::fmt::Debug for MigrationConfig {
    // source_url may carry a password
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationConfig")
            .field("source_url", &"<redacted>")
            .field("source_database", &self.source_database)
            .field("destination_path", &self.destination_path)
            .field("filter", &self.filter)
            .finish()
    }
}

fn parse_config_file(path: &str) -> Result<ConfigFile> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path))?;
    toml::from_str(&raw).with_context(|| format!("Failed to parse TOML config at {}", path))
}

/// Build the run configuration from an optional TOML file plus CLI overrides
///
/// The source database defaults to the database named in the source URL.
pub fn load_migration_config(
    config_path: Option<&str>,
    overrides: ConfigOverrides,
) -> Result<MigrationConfig> {
    let file = match config_path {
        Some(path) => parse_config_file(path)?,
        None => ConfigFile::default(),
    };

    let source_url = overrides
        .source_url
        .or(file.source.url)
        .context("No MySQL source configured (use --source or [source].url)")?;
    crate::mysql::validate_mysql_url(&source_url)?;

    let source_database = match overrides.source_database.or(file.source.database) {
        Some(name) => name,
        None => crate::mysql::extract_database_name(&source_url).context(
            "No source database configured and none found in the source URL \
             (use --source-database or [source].database)",
        )?,
    };
    crate::utils::validate_identifier(&source_database).context("Invalid source database name")?;

    let destination = overrides
        .destination_path
        .or(file.destination.path)
        .context("No SQLite destination configured (use --destination or [destination].path)")?;
    let destination_path = crate::sqlite::validate_sqlite_path(&destination)?;

    let (include_tables, exclude_tables) = match (overrides.include_tables, overrides.exclude_tables)
    {
        (None, None) => (file.tables.include, file.tables.exclude),
        cli => cli,
    };
    let filter = TableFilter::new(include_tables, exclude_tables)?;

    let config = MigrationConfig {
        source_url,
        source_database,
        destination_path,
        filter,
    };
    tracing::debug!("Loaded configuration: {:?}", config);

    Ok(config)
}
