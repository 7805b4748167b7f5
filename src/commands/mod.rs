// ABOUTME: Command implementations for the CLI subcommands
// ABOUTME: Exports migrate and validate

pub mod migrate;
pub mod validate;

pub use migrate::migrate;
pub use validate::{check_destination_tables, validate};
