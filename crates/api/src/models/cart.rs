//! Cart domain types and their wire representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use trinity_core::{CartId, CartItemId, ProductId, Quantity};

/// A buyer's cart with its resolved line items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    pub id: CartId,
    /// The buyer who owns this cart (one cart per buyer).
    pub owner_username: String,
    /// Lines in insertion order. Never two lines for the same product.
    pub items: Vec<CartItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line within a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    /// Current catalog name of the product, resolved at read time.
    pub product_name: String,
    pub quantity: Quantity,
}

/// Cart as sent over the wire.
///
/// ```json
/// { "ownerUsername": "alice", "items": [ { "productName": "Pedigree", "quantity": 2 } ] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartPayload {
    pub owner_username: String,
    pub items: Vec<CartLinePayload>,
}

/// One cart line as sent over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLinePayload {
    pub product_name: String,
    pub quantity: Quantity,
}

impl From<&Cart> for CartPayload {
    fn from(cart: &Cart) -> Self {
        Self {
            owner_username: cart.owner_username.clone(),
            items: cart.items.iter().map(CartLinePayload::from).collect(),
        }
    }
}

impl From<&CartItem> for CartLinePayload {
    fn from(item: &CartItem) -> Self {
        Self {
            product_name: item.product_name.clone(),
            quantity: item.quantity,
        }
    }
}
