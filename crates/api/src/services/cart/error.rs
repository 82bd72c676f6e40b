//! Cart service error types.

use thiserror::Error;

use trinity_core::QuantityError;

use crate::db::RepositoryError;
use crate::services::authz::AccessError;

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The guard refused the request.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// `productName` missing on add or update.
    #[error("product name and quantity are required")]
    MissingFields,

    /// `productName` missing on remove.
    #[error("product name is required")]
    MissingProduct,

    /// Quantity is not a positive integer.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(#[from] QuantityError),

    /// No catalog product has this name.
    #[error("product '{0}' not found")]
    ProductNotFound(String),

    /// The buyer has no cart yet.
    #[error("cart for '{0}' not found")]
    CartNotFound(String),

    /// The cart has no line for this product.
    #[error("item '{0}' not found in cart")]
    ItemNotFound(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for CartError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Quantity(e) => Self::InvalidQuantity(e),
            other => Self::Repository(other),
        }
    }
}
