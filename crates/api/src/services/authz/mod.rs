//! Cart authorization.
//!
//! Every cart operation first checks that the target user exists, is a buyer,
//! and is the one acting. Checks run in that order and the first failure wins.

mod error;

pub use error::AccessError;

use tracing::instrument;

use crate::db::IdentityLookup;
use crate::models::User;

/// Gatekeeper run before any cart operation.
#[derive(Clone, Copy)]
pub struct AuthorizationGuard<'a> {
    identities: &'a dyn IdentityLookup,
}

impl<'a> AuthorizationGuard<'a> {
    /// Create a new guard over an identity source.
    #[must_use]
    pub const fn new(identities: &'a dyn IdentityLookup) -> Self {
        Self { identities }
    }

    /// Check that `acting_username` may operate on the cart of `target_username`.
    ///
    /// Returns the resolved target user on success.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::UserNotFound` if the target does not exist.
    /// Returns `AccessError::ForbiddenRole` if the target is not a buyer.
    /// Returns `AccessError::ForbiddenAccess` if the actor is not the target.
    #[instrument(skip(self))]
    pub async fn authorize(
        &self,
        target_username: &str,
        acting_username: &str,
    ) -> Result<User, AccessError> {
        let user = self
            .identities
            .find_by_username(target_username)
            .await?
            .ok_or_else(|| AccessError::UserNotFound(target_username.to_owned()))?;

        if !user.is_buyer() {
            return Err(AccessError::ForbiddenRole {
                username: user.username,
                role: user.role,
            });
        }

        if acting_username != target_username {
            return Err(AccessError::ForbiddenAccess {
                actor: acting_username.to_owned(),
                target: target_username.to_owned(),
            });
        }

        Ok(user)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use trinity_core::{Email, Role};

    use super::*;
    use crate::db::{MemoryStore, UserStore};
    use crate::models::NewUser;

    async fn store_with(users: &[(&str, Role)]) -> MemoryStore {
        let store = MemoryStore::new();
        for (username, role) in users {
            store
                .create_user(NewUser {
                    username: (*username).to_owned(),
                    name: (*username).to_owned(),
                    email: Email::parse(&format!("{username}@example.com")).unwrap(),
                    role: *role,
                })
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_owner_is_allowed() {
        let store = store_with(&[("alice", Role::Buyer)]).await;
        let guard = AuthorizationGuard::new(&store);

        let user = guard.authorize("alice", "alice").await.unwrap();
        assert_eq!(user.username, "alice");
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let store = store_with(&[]).await;
        let guard = AuthorizationGuard::new(&store);

        let err = guard.authorize("ghost", "ghost").await.unwrap_err();
        assert!(matches!(err, AccessError::UserNotFound(ref u) if u == "ghost"));
    }

    #[tokio::test]
    async fn test_seller_is_rejected_by_role() {
        let store = store_with(&[("sam", Role::Seller)]).await;
        let guard = AuthorizationGuard::new(&store);

        let err = guard.authorize("sam", "sam").await.unwrap_err();
        assert!(matches!(err, AccessError::ForbiddenRole { role: Role::Seller, .. }));
    }

    #[tokio::test]
    async fn test_other_actor_is_rejected() {
        let store = store_with(&[("alice", Role::Buyer), ("mallory", Role::Buyer)]).await;
        let guard = AuthorizationGuard::new(&store);

        let err = guard.authorize("alice", "mallory").await.unwrap_err();
        assert!(matches!(
            err,
            AccessError::ForbiddenAccess { ref actor, ref target } if actor == "mallory" && target == "alice"
        ));
    }

    #[tokio::test]
    async fn test_role_checked_before_actor() {
        let store = store_with(&[("sam", Role::Seller)]).await;
        let guard = AuthorizationGuard::new(&store);

        let err = guard.authorize("sam", "mallory").await.unwrap_err();
        assert!(matches!(err, AccessError::ForbiddenRole { .. }));
    }
}
