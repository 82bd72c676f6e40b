//! User repository backed by `shop.app_user`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use trinity_core::{Email, Role};

use super::conflict_on_unique;
use crate::db::{IdentityLookup, RepositoryError, UserStore};
use crate::models::{NewUser, User, UserUpdate};

#[derive(sqlx::FromRow)]
struct UserRow {
    username: String,
    name: String,
    email: Email,
    role: Role,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            username: row.username,
            name: row.name,
            email: row.email,
            role: row.role,
            created_at: row.created_at,
        }
    }
}

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityLookup for PgUserRepository {
    #[instrument(skip(self))]
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT username, name, email, role, created_at
            FROM shop.app_user
            WHERE username = $1
            ",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }
}

#[async_trait]
impl UserStore for PgUserRepository {
    #[instrument(skip(self))]
    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(
            r"
            SELECT username, name, email, role, created_at
            FROM shop.app_user
            ORDER BY username
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    #[instrument(skip(self, user), fields(username = %user.username))]
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO shop.app_user (username, name, email, role)
            VALUES ($1, $2, $3, $4)
            RETURNING username, name, email, role, created_at
            ",
        )
        .bind(&user.username)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "username already exists"))?;

        Ok(row.into())
    }

    #[instrument(skip(self, update))]
    async fn update_user(
        &self,
        username: &str,
        update: UserUpdate,
    ) -> Result<User, RepositoryError> {
        // Carts and products follow a rename via ON UPDATE CASCADE.
        let row = sqlx::query_as::<_, UserRow>(
            r"
            UPDATE shop.app_user
            SET username = COALESCE($2, username),
                name = COALESCE($3, name),
                email = COALESCE($4, email),
                role = COALESCE($5, role)
            WHERE username = $1
            RETURNING username, name, email, role, created_at
            ",
        )
        .bind(username)
        .bind(update.username)
        .bind(update.name)
        .bind(update.email)
        .bind(update.role)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "username already exists"))?;

        row.map(User::from).ok_or(RepositoryError::NotFound)
    }
}
