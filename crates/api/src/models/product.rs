//! Product domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use trinity_core::{Price, ProductId};

/// A catalog product.
///
/// Also the on-disk record format of `products.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    /// Unique within the catalog.
    #[serde(rename = "productName")]
    pub name: String,
    pub category: String,
    pub price: Price,
    /// Seller who lists the product.
    pub owner_username: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// A validated product ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub category: String,
    pub price: Price,
    pub owner_username: String,
}

/// A validated partial update. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
    pub price: Option<Price>,
}
