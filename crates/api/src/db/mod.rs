//! Persistence for users, products, and carts.
//!
//! The services only see the async store traits defined here; two backends
//! implement them:
//!
//! - [`postgres`] - `PostgreSQL` via sqlx (schema `shop`)
//! - [`memory`] - in-memory tables, optionally mirrored to flat JSON files
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p trinity-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use trinity_core::{CartId, CartItemId, ProductId, Quantity, QuantityError};

use crate::config::StorageConfig;
use crate::models::{Cart, CartItem, NewProduct, NewUser, Product, ProductUpdate, User, UserUpdate};

pub use memory::MemoryStore;
pub use postgres::{PgCartRepository, PgProductRepository, PgUserRepository};

/// Errors raised by any store backend.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Reading or writing a data file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A data file could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored data violates a domain invariant.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate username).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A merged line quantity would not fit the quantity column.
    #[error("quantity out of range: {0}")]
    Quantity(#[from] QuantityError),
}

// =============================================================================
// Store Traits
// =============================================================================

/// Resolves usernames to user records.
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    /// Find a user by username.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError>;
}

/// Full user persistence.
#[async_trait]
pub trait UserStore: IdentityLookup {
    /// All users ordered by username.
    async fn list_users(&self) -> Result<Vec<User>, RepositoryError>;

    /// Insert a user.
    ///
    /// Returns `RepositoryError::Conflict` if the username is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError>;

    /// Apply a partial update to an existing user.
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist and
    /// `RepositoryError::Conflict` if a rename collides with another user.
    async fn update_user(
        &self,
        username: &str,
        update: UserUpdate,
    ) -> Result<User, RepositoryError>;
}

/// Resolves product names to catalog records.
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    /// Find a product by its exact name.
    async fn find_by_name(&self, name: &str) -> Result<Option<Product>, RepositoryError>;
}

/// Full catalog persistence.
#[async_trait]
pub trait ProductStore: CatalogLookup {
    /// All products in insertion order.
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError>;

    /// Insert a product.
    ///
    /// Returns `RepositoryError::Conflict` if the name is taken.
    async fn create_product(&self, product: NewProduct) -> Result<Product, RepositoryError>;

    /// Apply a partial update to an existing product.
    ///
    /// Returns `RepositoryError::NotFound` or `RepositoryError::Conflict`.
    async fn update_product(
        &self,
        name: &str,
        update: ProductUpdate,
    ) -> Result<Product, RepositoryError>;

    /// Delete a product and every cart line that references it.
    ///
    /// Returns `RepositoryError::NotFound` if no product has this name.
    async fn delete_product(&self, name: &str) -> Result<Product, RepositoryError>;
}

/// Cart persistence keyed by owner, cart, and product identity.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Find the cart owned by a user.
    async fn find_by_owner(&self, username: &str) -> Result<Option<Cart>, RepositoryError>;

    /// Create an empty cart for a user.
    ///
    /// Stores hold at most one cart per owner: if one already exists it is
    /// returned unchanged instead of creating a second.
    async fn create(&self, username: &str) -> Result<Cart, RepositoryError>;

    /// Find the line for a product within a cart.
    async fn find_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartItem>, RepositoryError>;

    /// Append a line to a cart.
    ///
    /// If a line for the product already exists (a concurrent add won the
    /// race), its quantity is increased instead so lines stay unique.
    async fn add_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<CartItem, RepositoryError>;

    /// Overwrite the quantity of a line.
    ///
    /// Returns `RepositoryError::NotFound` if the line does not exist.
    async fn set_item_quantity(
        &self,
        item_id: CartItemId,
        quantity: Quantity,
    ) -> Result<CartItem, RepositoryError>;

    /// Remove all lines for a product within a cart, returning how many went.
    async fn remove_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<u64, RepositoryError>;
}

// =============================================================================
// Backend Wiring
// =============================================================================

/// The store handles shared by every request.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub products: Arc<dyn ProductStore>,
    pub carts: Arc<dyn CartStore>,
    pool: Option<PgPool>,
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores")
            .field("postgres", &self.pool.is_some())
            .finish_non_exhaustive()
    }
}

impl Stores {
    /// Use one in-memory (or JSON-file) store for every trait.
    #[must_use]
    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            users: store.clone(),
            products: store.clone(),
            carts: store,
            pool: None,
        }
    }

    /// Use the `PostgreSQL` repositories over a shared pool.
    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            products: Arc::new(PgProductRepository::new(pool.clone())),
            carts: Arc::new(PgCartRepository::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// Open the backend selected by configuration.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the database is unreachable or a JSON data
    /// file cannot be read.
    pub async fn connect(storage: &StorageConfig) -> Result<Self, RepositoryError> {
        match storage {
            StorageConfig::Memory => Ok(Self::memory(Arc::new(MemoryStore::new()))),
            StorageConfig::Json { data_dir } => {
                let store = MemoryStore::open(data_dir).await?;
                Ok(Self::memory(Arc::new(store)))
            }
            StorageConfig::Postgres { database_url } => {
                let pool = create_pool(database_url).await?;
                Ok(Self::postgres(pool))
            }
        }
    }

    /// The `PostgreSQL` pool, when that backend is in use.
    #[must_use]
    pub const fn pool(&self) -> Option<&PgPool> {
        self.pool.as_ref()
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
