//! Catalog repository backed by `shop.product`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use trinity_core::{Price, ProductId};

use super::conflict_on_unique;
use crate::db::{CatalogLookup, ProductStore, RepositoryError};
use crate::models::{NewProduct, Product, ProductUpdate};

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    category: String,
    price: Price,
    owner_username: String,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            category: row.category,
            price: row.price,
            owner_username: row.owner_username,
            created_at: row.created_at,
        }
    }
}

/// Repository for catalog database operations.
#[derive(Debug, Clone)]
pub struct PgProductRepository {
    pool: PgPool,
}

impl PgProductRepository {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogLookup for PgProductRepository {
    #[instrument(skip(self))]
    async fn find_by_name(&self, name: &str) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, category, price, owner_username, created_at
            FROM shop.product
            WHERE name = $1
            ",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Product::from))
    }
}

#[async_trait]
impl ProductStore for PgProductRepository {
    #[instrument(skip(self))]
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, category, price, owner_username, created_at
            FROM shop.product
            ORDER BY id
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    #[instrument(skip(self, product), fields(name = %product.name))]
    async fn create_product(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            INSERT INTO shop.product (name, category, price, owner_username)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, category, price, owner_username, created_at
            ",
        )
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.price)
        .bind(&product.owner_username)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "product name already exists"))?;

        Ok(row.into())
    }

    #[instrument(skip(self, update))]
    async fn update_product(
        &self,
        name: &str,
        update: ProductUpdate,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            UPDATE shop.product
            SET name = COALESCE($2, name),
                category = COALESCE($3, category),
                price = COALESCE($4, price)
            WHERE name = $1
            RETURNING id, name, category, price, owner_username, created_at
            ",
        )
        .bind(name)
        .bind(update.name)
        .bind(update.category)
        .bind(update.price)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "product name already exists"))?;

        row.map(Product::from).ok_or(RepositoryError::NotFound)
    }

    #[instrument(skip(self))]
    async fn delete_product(&self, name: &str) -> Result<Product, RepositoryError> {
        // cart_item rows go with it (ON DELETE CASCADE).
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            DELETE FROM shop.product
            WHERE name = $1
            RETURNING id, name, category, price, owner_username, created_at
            ",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Product::from).ok_or(RepositoryError::NotFound)
    }
}
