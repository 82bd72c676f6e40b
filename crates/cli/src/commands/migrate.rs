//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! trinity-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `TRINITY_DATABASE_URL` - `PostgreSQL` connection string, falls back to
//!   `DATABASE_URL`
//!
//! Migrations live in `crates/api/migrations/` and create the `shop` schema.

use secrecy::SecretString;

use super::CommandError;

/// Run the API database migrations.
///
/// # Errors
///
/// Returns an error if no database URL is set, the connection fails, or a
/// migration fails to apply.
pub async fn run() -> Result<(), CommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("TRINITY_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("TRINITY_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    let pool = trinity_api::db::create_pool(&database_url).await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../api/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
