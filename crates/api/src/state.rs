//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::db::Stores;
use crate::services::{AuthorizationGuard, CartService, ProductService, UserService};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and hands out request-scoped
/// services over the configured stores.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    stores: Stores,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(stores: Stores) -> Self {
        Self {
            inner: Arc::new(AppStateInner { stores }),
        }
    }

    /// Get a reference to the store handles.
    #[must_use]
    pub fn stores(&self) -> &Stores {
        &self.inner.stores
    }

    /// Get the `PostgreSQL` pool, when that backend is in use.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.stores.pool()
    }

    /// Cart service over the configured stores.
    #[must_use]
    pub fn cart_service(&self) -> CartService<'_> {
        let stores = self.stores();
        CartService::new(
            AuthorizationGuard::new(stores.users.as_ref()),
            stores.products.as_ref(),
            stores.carts.as_ref(),
        )
    }

    /// User service over the configured stores.
    #[must_use]
    pub fn user_service(&self) -> UserService<'_> {
        let stores = self.stores();
        UserService::new(
            stores.users.as_ref(),
            stores.products.as_ref(),
            stores.carts.as_ref(),
        )
    }

    /// Product service over the configured stores.
    #[must_use]
    pub fn product_service(&self) -> ProductService<'_> {
        let stores = self.stores();
        ProductService::new(stores.products.as_ref(), stores.users.as_ref())
    }
}
