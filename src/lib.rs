// ABOUTME: Library module for mysql-sqlite-migrator
// ABOUTME: Exports all core functionality for use in binary and tests

pub mod commands;
pub mod config;
pub mod filters;
pub mod migration;
pub mod mysql;
pub mod sqlite;
pub mod utils;
