//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Failures render as
//! `{ "success": false, "message": ... }`; server errors are captured to
//! Sentry and their details are never sent to the client.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{AccessError, CartError, ProductError, UserError};

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Cart operation failed.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// User operation failed.
    #[error(transparent)]
    User(#[from] UserError),

    /// Catalog operation failed.
    #[error(transparent)]
    Product(#[from] ProductError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// No acting user was identified.
    #[error("{0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("{0}")]
    BadRequest(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Cart(err) => match err {
                CartError::Access(access) => match access {
                    AccessError::UserNotFound(_) => StatusCode::NOT_FOUND,
                    AccessError::ForbiddenRole { .. } | AccessError::ForbiddenAccess { .. } => {
                        StatusCode::FORBIDDEN
                    }
                    AccessError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
                },
                CartError::MissingFields
                | CartError::MissingProduct
                | CartError::InvalidQuantity(_) => StatusCode::BAD_REQUEST,
                CartError::ProductNotFound(_)
                | CartError::CartNotFound(_)
                | CartError::ItemNotFound(_) => StatusCode::NOT_FOUND,
                CartError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::User(err) => match err {
                UserError::Invalid(_) => StatusCode::BAD_REQUEST,
                UserError::NotFound => StatusCode::NOT_FOUND,
                UserError::Conflict(_) | UserError::RoleLocked(_) => StatusCode::CONFLICT,
                UserError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Product(err) => match err {
                ProductError::Invalid(_) => StatusCode::BAD_REQUEST,
                ProductError::NotFound => StatusCode::NOT_FOUND,
                ProductError::Conflict(_) => StatusCode::CONFLICT,
                ProductError::OwnerNotFound(_) | ProductError::OwnerNotSeller(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                ProductError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry; don't expose their details
        let message = if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
            "Internal server error".to_owned()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use trinity_core::{QuantityError, Role};

    use super::*;

    fn get_status(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_cart_error_status_codes() {
        assert_eq!(
            get_status(CartError::Access(AccessError::UserNotFound("x".to_owned()))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(CartError::Access(AccessError::ForbiddenRole {
                username: "sam".to_owned(),
                role: Role::Seller,
            })),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(CartError::Access(AccessError::ForbiddenAccess {
                actor: "mallory".to_owned(),
                target: "alice".to_owned(),
            })),
            StatusCode::FORBIDDEN
        );
        assert_eq!(get_status(CartError::MissingFields), StatusCode::BAD_REQUEST);
        assert_eq!(get_status(CartError::MissingProduct), StatusCode::BAD_REQUEST);
        assert_eq!(
            get_status(CartError::InvalidQuantity(QuantityError::NotPositive(0))),
            StatusCode::BAD_REQUEST
        );
        for err in [
            CartError::ProductNotFound("p".to_owned()),
            CartError::CartNotFound("c".to_owned()),
            CartError::ItemNotFound("i".to_owned()),
        ] {
            assert_eq!(get_status(err), StatusCode::NOT_FOUND);
        }
        assert_eq!(
            get_status(CartError::Repository(RepositoryError::NotFound)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_catalog_and_user_status_codes() {
        assert_eq!(
            get_status(UserError::Conflict("taken".to_owned())),
            StatusCode::CONFLICT
        );
        assert_eq!(get_status(UserError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            get_status(UserError::RoleLocked("owns products")),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(ProductError::OwnerNotSeller("alice".to_owned())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            get_status(ProductError::Invalid("bad".to_owned())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Unauthorized("who?".to_owned())),
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn test_body_envelope() {
        let response = AppError::from(UserError::NotFound).into_response();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, json!({ "success": false, "message": "User not found." }));
    }

    #[tokio::test]
    async fn test_server_errors_hide_details() {
        let err = AppError::Database(RepositoryError::DataCorruption("secret".to_owned()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(!text.contains("secret"));
        assert!(text.contains("Internal server error"));
    }
}
