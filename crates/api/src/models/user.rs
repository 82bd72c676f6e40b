//! User domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use trinity_core::{Email, Role};

/// A registered shop user.
///
/// Also the on-disk record format of `users.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identity key.
    pub username: String,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: Email,
    /// Buyer or seller.
    pub role: Role,
    /// When the user registered.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Whether this user may own a cart.
    #[must_use]
    pub fn is_buyer(&self) -> bool {
        self.role == Role::Buyer
    }
}

/// A validated user ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub name: String,
    pub email: Email,
    pub role: Role,
}

/// A validated partial update. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    /// Rename the user; carts and owned products follow the new name.
    pub username: Option<String>,
    pub name: Option<String>,
    pub email: Option<Email>,
    pub role: Option<Role>,
}
