//! CLI subcommands.

pub mod migrate;
pub mod seed;

use thiserror::Error;
use trinity_api::config::ConfigError;
use trinity_api::db::RepositoryError;
use trinity_api::services::{ProductError, UserError};

/// Errors surfaced by any subcommand.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Storage error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid seed file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Seeding user failed: {0}")]
    User(#[from] UserError),

    #[error("Seeding product failed: {0}")]
    Product(#[from] ProductError),
}
