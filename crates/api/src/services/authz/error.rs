//! Authorization error types.

use thiserror::Error;

use trinity_core::Role;

use crate::db::RepositoryError;

/// Why an acting user may not touch a cart.
#[derive(Debug, Error)]
pub enum AccessError {
    /// The target username does not resolve to a user.
    #[error("user '{0}' not found")]
    UserNotFound(String),

    /// The target user exists but may not own a cart.
    #[error("user '{username}' is a {role}; only buyers have carts")]
    ForbiddenRole { username: String, role: Role },

    /// Someone other than the cart owner is acting.
    #[error("'{actor}' may not access the cart of '{target}'")]
    ForbiddenAccess { actor: String, target: String },

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
