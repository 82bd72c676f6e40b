//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                   - Liveness check
//! GET    /health/ready             - Readiness check (pings Postgres)
//!
//! # Users
//! POST   /users                    - Register a user
//! GET    /users                    - List users
//! GET    /users/{username}         - Get a user
//! PATCH  /users/{username}         - Update (or rename) a user
//!
//! # Products
//! POST   /products                 - List a product for sale
//! GET    /products                 - Catalog
//! GET    /products/{name}          - Get a product
//! PATCH  /products/{name}          - Update a product
//! DELETE /products/{name}          - Delete a product
//!
//! # Carts (require X-Acting-User)
//! GET    /carts/{username}         - Get (or create) the cart
//! POST   /carts/{username}/add     - Add a product
//! PATCH  /carts/{username}/items   - Set a line's quantity
//! DELETE /carts/{username}/remove  - Remove a product
//! ```

pub mod carts;
pub mod health;
pub mod products;
pub mod users;

use axum::{
    Router,
    extract::{FromRequest, Request},
    middleware,
    routing::{delete, get, patch, post},
};
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::state::AppState;

/// JSON body extractor whose rejections use the API error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(users::create).get(users::index))
        .route("/{username}", get(users::show).patch(users::update))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(products::create).get(products::index))
        .route(
            "/{name}",
            get(products::show)
                .patch(products::update)
                .delete(products::destroy),
        )
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/{username}", get(carts::show))
        .route("/{username}/add", post(carts::add))
        .route("/{username}/items", patch(carts::update))
        .route("/{username}/remove", delete(carts::remove))
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/users", user_routes())
        .nest("/products", product_routes())
        .nest("/carts", cart_routes())
}

/// Build the full application router with tracing and request IDs.
///
/// Sentry layers are added by the binary so tests can run without a hub.
pub fn build_router(state: AppState) -> Router {
    routes()
        .layer(middleware::from_fn(
            crate::middleware::request_id_middleware,
        ))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                    acting_user = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::build_router;
    use crate::db::{MemoryStore, Stores};
    use crate::middleware::ACTING_USER_HEADER;
    use crate::state::AppState;

    /// Router over a fresh in-memory store.
    pub fn app() -> axum::Router {
        let stores = Stores::memory(Arc::new(MemoryStore::new()));
        build_router(AppState::new(stores))
    }

    /// Send one request and decode the JSON response.
    pub async fn send(
        app: &axum::Router,
        method: Method,
        uri: &str,
        acting: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(acting) = acting {
            builder = builder.header(ACTING_USER_HEADER, acting);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }
}
