//! Cart repository backed by `shop.cart` and `shop.cart_item`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use trinity_core::{CartId, CartItemId, ProductId, Quantity, QuantityError};

use crate::db::{CartStore, RepositoryError};
use crate::models::{Cart, CartItem};

/// SQLSTATE `numeric_value_out_of_range`.
const OUT_OF_RANGE: &str = "22003";

/// A merge past `INTEGER` range is a quantity overflow, not a database fault.
fn merge_error(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.code().as_deref() == Some(OUT_OF_RANGE)
    {
        return QuantityError::Overflow.into();
    }
    RepositoryError::Database(e)
}

#[derive(sqlx::FromRow)]
struct CartRow {
    id: CartId,
    owner_username: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct CartItemRow {
    id: CartItemId,
    cart_id: CartId,
    product_id: ProductId,
    product_name: String,
    quantity: i32,
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = RepositoryError;

    fn try_from(row: CartItemRow) -> Result<Self, Self::Error> {
        let quantity = Quantity::new(i64::from(row.quantity)).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid quantity in cart item {}: {e}", row.id))
        })?;

        Ok(Self {
            id: row.id,
            cart_id: row.cart_id,
            product_id: row.product_id,
            product_name: row.product_name,
            quantity,
        })
    }
}

const ITEM_COLUMNS: &str = r"
    ci.id, ci.cart_id, ci.product_id, p.name AS product_name, ci.quantity
";

/// Repository for cart database operations.
#[derive(Debug, Clone)]
pub struct PgCartRepository {
    pool: PgPool,
}

impl PgCartRepository {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_items(&self, cart_id: CartId) -> Result<Vec<CartItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartItemRow>(&format!(
            r"
            SELECT {ITEM_COLUMNS}
            FROM shop.cart_item ci
            JOIN shop.product p ON p.id = ci.product_id
            WHERE ci.cart_id = $1
            ORDER BY ci.id
            "
        ))
        .bind(cart_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CartItem::try_from).collect()
    }

    async fn assemble(&self, row: CartRow) -> Result<Cart, RepositoryError> {
        let items = self.load_items(row.id).await?;
        Ok(Cart {
            id: row.id,
            owner_username: row.owner_username,
            items,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Bump the cart's `updated_at` inside the caller's transaction.
async fn touch_cart(conn: &mut PgConnection, cart_id: CartId) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE shop.cart SET updated_at = now() WHERE id = $1")
        .bind(cart_id)
        .execute(conn)
        .await?;
    Ok(())
}

#[async_trait]
impl CartStore for PgCartRepository {
    #[instrument(skip(self))]
    async fn find_by_owner(&self, username: &str) -> Result<Option<Cart>, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            SELECT id, owner_username, created_at, updated_at
            FROM shop.cart
            WHERE owner_username = $1
            ",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.assemble(row).await?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn create(&self, username: &str) -> Result<Cart, RepositoryError> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let row = sqlx::query_as::<_, CartRow>(
            r"
            INSERT INTO shop.cart (owner_username)
            VALUES ($1)
            ON CONFLICT (owner_username)
                DO UPDATE SET owner_username = EXCLUDED.owner_username
            RETURNING id, owner_username, created_at, updated_at
            ",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await?;

        self.assemble(row).await
    }

    #[instrument(skip(self))]
    async fn find_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<Option<CartItem>, RepositoryError> {
        let row = sqlx::query_as::<_, CartItemRow>(&format!(
            r"
            SELECT {ITEM_COLUMNS}
            FROM shop.cart_item ci
            JOIN shop.product p ON p.id = ci.product_id
            WHERE ci.cart_id = $1 AND ci.product_id = $2
            "
        ))
        .bind(cart_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CartItem::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn add_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<CartItem, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, CartItemRow>(&format!(
            r"
            WITH upserted AS (
                INSERT INTO shop.cart_item (cart_id, product_id, quantity)
                VALUES ($1, $2, $3)
                ON CONFLICT (cart_id, product_id)
                    DO UPDATE SET quantity = shop.cart_item.quantity + EXCLUDED.quantity
                RETURNING id, cart_id, product_id, quantity
            )
            SELECT {ITEM_COLUMNS}
            FROM upserted ci
            JOIN shop.product p ON p.id = ci.product_id
            "
        ))
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity.as_i32())
        .fetch_optional(&mut *tx)
        .await
        .map_err(merge_error)?
        .ok_or(RepositoryError::NotFound)?;

        touch_cart(&mut tx, cart_id).await?;
        tx.commit().await?;

        row.try_into()
    }

    #[instrument(skip(self))]
    async fn set_item_quantity(
        &self,
        item_id: CartItemId,
        quantity: Quantity,
    ) -> Result<CartItem, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, CartItemRow>(&format!(
            r"
            WITH updated AS (
                UPDATE shop.cart_item
                SET quantity = $2
                WHERE id = $1
                RETURNING id, cart_id, product_id, quantity
            )
            SELECT {ITEM_COLUMNS}
            FROM updated ci
            JOIN shop.product p ON p.id = ci.product_id
            "
        ))
        .bind(item_id)
        .bind(quantity.as_i32())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        touch_cart(&mut tx, row.cart_id).await?;
        tx.commit().await?;

        row.try_into()
    }

    #[instrument(skip(self))]
    async fn remove_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query(
            r"
            DELETE FROM shop.cart_item
            WHERE cart_id = $1 AND product_id = $2
            ",
        )
        .bind(cart_id)
        .bind(product_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if removed > 0 {
            touch_cart(&mut tx, cart_id).await?;
        }
        tx.commit().await?;

        Ok(removed)
    }
}
