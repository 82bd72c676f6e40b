//! Cart domain service.
//!
//! Owns the cart rules: one cart per buyer, at most one line per product,
//! adding an existing product sums quantities, and every mutation answers
//! with the cart as re-read from the store.

mod error;

pub use error::CartError;

use tracing::{debug, instrument};

use trinity_core::Quantity;

use super::authz::AuthorizationGuard;
use crate::db::{CartStore, CatalogLookup};
use crate::models::Cart;

/// Cart operations for a single buyer at a time.
pub struct CartService<'a> {
    guard: AuthorizationGuard<'a>,
    catalog: &'a dyn CatalogLookup,
    carts: &'a dyn CartStore,
}

impl<'a> CartService<'a> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(
        guard: AuthorizationGuard<'a>,
        catalog: &'a dyn CatalogLookup,
        carts: &'a dyn CartStore,
    ) -> Self {
        Self {
            guard,
            catalog,
            carts,
        }
    }

    /// Return the buyer's cart, creating an empty one on first access.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Access` if the guard refuses the request.
    #[instrument(skip(self))]
    pub async fn get_cart(&self, username: &str, acting: &str) -> Result<Cart, CartError> {
        self.guard.authorize(username, acting).await?;
        self.get_or_create(username).await
    }

    /// Add `quantity` units of a product, merging into an existing line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Access` if the guard refuses the request.
    /// Returns `CartError::InvalidQuantity` if `quantity` is not positive.
    /// Returns `CartError::MissingFields` if `product_name` is blank.
    /// Returns `CartError::ProductNotFound` if the catalog has no such product.
    #[instrument(skip(self))]
    pub async fn add_to_cart(
        &self,
        username: &str,
        acting: &str,
        product_name: &str,
        quantity: i64,
    ) -> Result<Cart, CartError> {
        self.guard.authorize(username, acting).await?;

        let quantity = Quantity::new(quantity)?;
        let product_name = product_name.trim();
        if product_name.is_empty() {
            return Err(CartError::MissingFields);
        }

        let product = self
            .catalog
            .find_by_name(product_name)
            .await?
            .ok_or_else(|| CartError::ProductNotFound(product_name.to_owned()))?;

        let cart = self.get_or_create(username).await?;

        match self.carts.find_item(cart.id, product.id).await? {
            Some(existing) => {
                let merged = existing.quantity.checked_add(quantity)?;
                debug!(item = %existing.id, %merged, "merging into existing line");
                self.carts.set_item_quantity(existing.id, merged).await?;
            }
            None => {
                self.carts.add_item(cart.id, product.id, quantity).await?;
            }
        }

        self.reload(username).await
    }

    /// Remove every line for a product.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Access` if the guard refuses the request.
    /// Returns `CartError::MissingProduct` if `product_name` is blank.
    /// Returns `CartError::CartNotFound` if the buyer has no cart.
    /// Returns `CartError::ItemNotFound` if no line references the product.
    #[instrument(skip(self))]
    pub async fn remove_from_cart(
        &self,
        username: &str,
        acting: &str,
        product_name: &str,
    ) -> Result<Cart, CartError> {
        self.guard.authorize(username, acting).await?;

        let product_name = product_name.trim();
        if product_name.is_empty() {
            return Err(CartError::MissingProduct);
        }

        let cart = self
            .carts
            .find_by_owner(username)
            .await?
            .ok_or_else(|| CartError::CartNotFound(username.to_owned()))?;

        let item_not_found = || CartError::ItemNotFound(product_name.to_owned());
        let product = self
            .catalog
            .find_by_name(product_name)
            .await?
            .ok_or_else(item_not_found)?;
        self.carts
            .find_item(cart.id, product.id)
            .await?
            .ok_or_else(item_not_found)?;

        let removed = self.carts.remove_item(cart.id, product.id).await?;
        debug!(removed, "removed cart lines");

        self.reload(username).await
    }

    /// Overwrite the quantity of an existing line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Access` if the guard refuses the request.
    /// Returns `CartError::MissingFields` if `product_name` is blank.
    /// Returns `CartError::InvalidQuantity` if `quantity` is not positive.
    /// Returns `CartError::CartNotFound` if the buyer has no cart.
    /// Returns `CartError::ItemNotFound` if no line references the product.
    #[instrument(skip(self))]
    pub async fn update_cart_item_quantity(
        &self,
        username: &str,
        acting: &str,
        product_name: &str,
        quantity: i64,
    ) -> Result<Cart, CartError> {
        self.guard.authorize(username, acting).await?;

        let product_name = product_name.trim();
        if product_name.is_empty() {
            return Err(CartError::MissingFields);
        }
        let quantity = Quantity::new(quantity)?;

        let cart = self
            .carts
            .find_by_owner(username)
            .await?
            .ok_or_else(|| CartError::CartNotFound(username.to_owned()))?;

        let item_not_found = || CartError::ItemNotFound(product_name.to_owned());
        let product = self
            .catalog
            .find_by_name(product_name)
            .await?
            .ok_or_else(item_not_found)?;
        let item = self
            .carts
            .find_item(cart.id, product.id)
            .await?
            .ok_or_else(item_not_found)?;

        self.carts.set_item_quantity(item.id, quantity).await?;

        self.reload(username).await
    }

    async fn get_or_create(&self, username: &str) -> Result<Cart, CartError> {
        if let Some(cart) = self.carts.find_by_owner(username).await? {
            return Ok(cart);
        }
        debug!(username, "creating cart on first access");
        Ok(self.carts.create(username).await?)
    }

    /// Read the cart back after a mutation.
    async fn reload(&self, username: &str) -> Result<Cart, CartError> {
        self.carts
            .find_by_owner(username)
            .await?
            .ok_or_else(|| CartError::CartNotFound(username.to_owned()))
    }
}
