//! User registration and profile service.
//!
//! Validation reports only the first failing rule, with a message meant to be
//! shown to the caller as-is.

use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use trinity_core::{Email, Role};

use crate::db::{CartStore, ProductStore, RepositoryError, UserStore};
use crate::models::{NewUser, User, UserUpdate};

const USERNAME_TAKEN: &str = "Username already exists.";
const NEW_USERNAME_TAKEN: &str = "New username already exists.";
const INVALID_ROLE: &str = "Role must be 'buyer' or 'seller'.";
const INVALID_EMAIL: &str = "Invalid email format.";
const SELLER_OWNS_PRODUCTS: &str = "Cannot change role to buyer while owning products.";
const BUYER_OWNS_CART: &str = "Cannot change role to seller while owning a cart.";

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserError {
    /// A field failed validation.
    #[error("{0}")]
    Invalid(String),

    /// No user has this username.
    #[error("User not found.")]
    NotFound,

    /// The username is taken.
    #[error("{0}")]
    Conflict(String),

    /// The role cannot change while records tied to the current role exist.
    #[error("{0}")]
    RoleLocked(&'static str),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Registration request as received from a client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUserInput {
    pub username: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

/// Profile update as received from a client. Blank fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    pub new_username: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

/// User service.
///
/// Reads products and carts only to guard role changes.
pub struct UserService<'a> {
    users: &'a dyn UserStore,
    products: &'a dyn ProductStore,
    carts: &'a dyn CartStore,
}

impl<'a> UserService<'a> {
    /// Create a new user service.
    #[must_use]
    pub const fn new(
        users: &'a dyn UserStore,
        products: &'a dyn ProductStore,
        carts: &'a dyn CartStore,
    ) -> Self {
        Self {
            users,
            products,
            carts,
        }
    }

    /// Register a user.
    ///
    /// # Errors
    ///
    /// Returns `UserError::Invalid` for the first failing field rule.
    /// Returns `UserError::Conflict` if the username is taken.
    #[instrument(skip(self, input), fields(username = ?input.username))]
    pub async fn create(&self, input: NewUserInput) -> Result<User, UserError> {
        let new_user = validate_new(input)?;

        if self
            .users
            .find_by_username(&new_user.username)
            .await?
            .is_some()
        {
            return Err(UserError::Conflict(USERNAME_TAKEN.to_owned()));
        }

        self.users.create_user(new_user).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => UserError::Conflict(USERNAME_TAKEN.to_owned()),
            other => other.into(),
        })
    }

    /// List every user.
    ///
    /// # Errors
    ///
    /// Returns `UserError::Repository` if the store fails.
    pub async fn list(&self) -> Result<Vec<User>, UserError> {
        Ok(self.users.list_users().await?)
    }

    /// Get a user by username.
    ///
    /// # Errors
    ///
    /// Returns `UserError::NotFound` if no user has this username.
    pub async fn get(&self, username: &str) -> Result<User, UserError> {
        self.users
            .find_by_username(username)
            .await?
            .ok_or(UserError::NotFound)
    }

    /// Update a user's profile, optionally renaming them.
    ///
    /// # Errors
    ///
    /// Returns `UserError::Invalid` for the first failing field rule.
    /// Returns `UserError::NotFound` if the user does not exist.
    /// Returns `UserError::Conflict` if the new username is taken.
    /// Returns `UserError::RoleLocked` if a seller still owns products or a
    /// buyer still owns a cart.
    #[instrument(skip(self, patch))]
    pub async fn update(&self, username: &str, patch: UserPatch) -> Result<User, UserError> {
        let update = validate_patch(patch)?;

        let current = self.get(username).await?;
        if let Some(role) = update.role
            && role != current.role
        {
            self.check_role_change(&current).await?;
        }

        if let Some(new) = update.username.as_deref()
            && new != username
            && self.users.find_by_username(new).await?.is_some()
        {
            return Err(UserError::Conflict(NEW_USERNAME_TAKEN.to_owned()));
        }

        self.users
            .update_user(username, update)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => UserError::NotFound,
                RepositoryError::Conflict(_) => UserError::Conflict(NEW_USERNAME_TAKEN.to_owned()),
                other => other.into(),
            })
    }

    /// A seller keeps their role while listing products, a buyer while
    /// holding a cart.
    async fn check_role_change(&self, user: &User) -> Result<(), UserError> {
        match user.role {
            Role::Seller => {
                let owns_products = self
                    .products
                    .list_products()
                    .await?
                    .iter()
                    .any(|p| p.owner_username == user.username);
                if owns_products {
                    return Err(UserError::RoleLocked(SELLER_OWNS_PRODUCTS));
                }
            }
            Role::Buyer => {
                if self.carts.find_by_owner(&user.username).await?.is_some() {
                    return Err(UserError::RoleLocked(BUYER_OWNS_CART));
                }
            }
        }
        Ok(())
    }
}

/// Trimmed value, or `None` when absent or blank.
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn invalid(message: &str) -> UserError {
    UserError::Invalid(message.to_owned())
}

fn validate_new(input: NewUserInput) -> Result<NewUser, UserError> {
    let username = present(input.username).ok_or_else(|| invalid("Username is required."))?;
    let name = present(input.name).ok_or_else(|| invalid("Name is required."))?;
    let email = present(input.email).ok_or_else(|| invalid("Email is required."))?;
    let role = input
        .role
        .as_deref()
        .and_then(|r| r.parse::<Role>().ok())
        .ok_or_else(|| invalid(INVALID_ROLE))?;
    let email = Email::parse(&email).map_err(|_| invalid(INVALID_EMAIL))?;

    Ok(NewUser {
        username,
        name,
        email,
        role,
    })
}

fn validate_patch(patch: UserPatch) -> Result<UserUpdate, UserError> {
    let username = match patch.new_username {
        Some(raw) if raw.trim().is_empty() => return Err(invalid("New username is invalid.")),
        other => present(other),
    };
    let role = present(patch.role)
        .map(|r| r.parse::<Role>().map_err(|_| invalid(INVALID_ROLE)))
        .transpose()?;
    let email = present(patch.email)
        .map(|e| Email::parse(&e).map_err(|_| invalid(INVALID_EMAIL)))
        .transpose()?;

    Ok(UserUpdate {
        username,
        name: present(patch.name),
        email,
        role,
    })
}
