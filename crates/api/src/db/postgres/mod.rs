//! `PostgreSQL` repositories (schema `shop`).
//!
//! Queries are checked at runtime with `sqlx::query_as` so the crate builds
//! without a live database.

mod carts;
mod products;
mod users;

pub use carts::PgCartRepository;
pub use products::PgProductRepository;
pub use users::PgUserRepository;

use super::RepositoryError;

/// Map a unique-constraint violation to `Conflict`, anything else to `Database`.
fn conflict_on_unique(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}
