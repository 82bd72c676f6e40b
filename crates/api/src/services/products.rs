//! Catalog management service.

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use trinity_core::Price;

use crate::db::{IdentityLookup, ProductStore, RepositoryError};
use crate::models::{NewProduct, Product, ProductUpdate};

const NAME_TAKEN: &str = "Product name already exists.";
const INVALID_PRICE: &str = "Price must be a non-negative number.";

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum ProductError {
    /// A field failed validation.
    #[error("{0}")]
    Invalid(String),

    /// No product has this name.
    #[error("Product not found.")]
    NotFound,

    /// The product name is taken.
    #[error("{0}")]
    Conflict(String),

    /// The named owner does not exist.
    #[error("Owner '{0}' not found.")]
    OwnerNotFound(String),

    /// The named owner is not a seller.
    #[error("Only sellers can list products ('{0}' is not a seller).")]
    OwnerNotSeller(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// New product as received from a client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProductInput {
    pub product_name: Option<String>,
    pub category: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    pub owner_username: Option<String>,
}

/// Product update as received from a client. Absent fields are unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub product_name: Option<String>,
    pub category: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
}

/// Product service.
pub struct ProductService<'a> {
    products: &'a dyn ProductStore,
    identities: &'a dyn IdentityLookup,
}

impl<'a> ProductService<'a> {
    /// Create a new product service.
    #[must_use]
    pub const fn new(products: &'a dyn ProductStore, identities: &'a dyn IdentityLookup) -> Self {
        Self {
            products,
            identities,
        }
    }

    /// List a new product under a seller.
    ///
    /// # Errors
    ///
    /// Returns `ProductError::Invalid` for the first failing field rule.
    /// Returns `ProductError::OwnerNotFound` or `ProductError::OwnerNotSeller`
    /// if the owner may not list products.
    /// Returns `ProductError::Conflict` if the name is taken.
    #[instrument(skip(self, input), fields(name = ?input.product_name))]
    pub async fn create(&self, input: NewProductInput) -> Result<Product, ProductError> {
        let product = validate_new(input)?;

        let owner = self
            .identities
            .find_by_username(&product.owner_username)
            .await?
            .ok_or_else(|| ProductError::OwnerNotFound(product.owner_username.clone()))?;
        if owner.is_buyer() {
            return Err(ProductError::OwnerNotSeller(owner.username));
        }

        if self.products.find_by_name(&product.name).await?.is_some() {
            return Err(ProductError::Conflict(NAME_TAKEN.to_owned()));
        }

        self.products
            .create_product(product)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => ProductError::Conflict(NAME_TAKEN.to_owned()),
                other => other.into(),
            })
    }

    /// List the whole catalog.
    ///
    /// # Errors
    ///
    /// Returns `ProductError::Repository` if the store fails.
    pub async fn list(&self) -> Result<Vec<Product>, ProductError> {
        Ok(self.products.list_products().await?)
    }

    /// Get a product by name.
    ///
    /// # Errors
    ///
    /// Returns `ProductError::NotFound` if no product has this name.
    pub async fn get(&self, name: &str) -> Result<Product, ProductError> {
        self.products
            .find_by_name(name)
            .await?
            .ok_or(ProductError::NotFound)
    }

    /// Update a product's name, category, or price.
    ///
    /// Renaming is visible in every cart holding the product.
    ///
    /// # Errors
    ///
    /// Returns `ProductError::Invalid`, `ProductError::NotFound`, or
    /// `ProductError::Conflict`.
    #[instrument(skip(self, patch))]
    pub async fn update(&self, name: &str, patch: ProductPatch) -> Result<Product, ProductError> {
        let update = validate_patch(patch)?;

        self.get(name).await?;

        if let Some(new) = update.name.as_deref()
            && new != name
            && self.products.find_by_name(new).await?.is_some()
        {
            return Err(ProductError::Conflict(NAME_TAKEN.to_owned()));
        }

        self.products
            .update_product(name, update)
            .await
            .map_err(map_write_error)
    }

    /// Delete a product; cart lines holding it disappear with it.
    ///
    /// # Errors
    ///
    /// Returns `ProductError::NotFound` if no product has this name.
    #[instrument(skip(self))]
    pub async fn delete(&self, name: &str) -> Result<Product, ProductError> {
        self.products
            .delete_product(name)
            .await
            .map_err(map_write_error)
    }
}

fn map_write_error(e: RepositoryError) -> ProductError {
    match e {
        RepositoryError::NotFound => ProductError::NotFound,
        RepositoryError::Conflict(_) => ProductError::Conflict(NAME_TAKEN.to_owned()),
        other => other.into(),
    }
}

/// Trimmed value, or `None` when absent or blank.
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn invalid(message: &str) -> ProductError {
    ProductError::Invalid(message.to_owned())
}

fn parse_price(amount: Decimal) -> Result<Price, ProductError> {
    Price::new(amount).map_err(|_| invalid(INVALID_PRICE))
}

fn validate_new(input: NewProductInput) -> Result<NewProduct, ProductError> {
    let name = present(input.product_name).ok_or_else(|| invalid("Product name is required."))?;
    let category = present(input.category).ok_or_else(|| invalid("Category is required."))?;
    let price = input.price.ok_or_else(|| invalid(INVALID_PRICE)).and_then(parse_price)?;
    let owner_username =
        present(input.owner_username).ok_or_else(|| invalid("Owner username is required."))?;

    Ok(NewProduct {
        name,
        category,
        price,
        owner_username,
    })
}

fn validate_patch(patch: ProductPatch) -> Result<ProductUpdate, ProductError> {
    let name = match patch.product_name {
        Some(raw) if raw.trim().is_empty() => return Err(invalid("Product name is invalid.")),
        other => present(other),
    };
    let category = match patch.category {
        Some(raw) if raw.trim().is_empty() => return Err(invalid("Category is invalid.")),
        other => present(other),
    };

    Ok(ProductUpdate {
        name,
        category,
        price: patch.price.map(parse_price).transpose()?,
    })
}
