//! Product route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;
use tracing::instrument;

use super::ApiJson;
use crate::error::Result;
use crate::models::Product;
use crate::services::{NewProductInput, ProductPatch};
use crate::state::AppState;

/// Response carrying one product.
#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub product: Product,
}

/// Response carrying the catalog.
#[derive(Debug, Serialize)]
pub struct ProductsResponse {
    pub success: bool,
    pub products: Vec<Product>,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            success: true,
            message: None,
            product,
        }
    }
}

/// List a product for sale.
///
/// # Errors
///
/// Returns 400 on validation failure, 409 if the name is taken, and 422 if
/// the owner is unknown or not a seller.
#[instrument(skip(state, body))]
pub async fn create(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<NewProductInput>,
) -> Result<(StatusCode, Json<ProductResponse>)> {
    let product = state.product_service().create(body).await?;
    tracing::info!(product = %product.name, owner = %product.owner_username, "product listed");
    Ok((StatusCode::CREATED, Json(product.into())))
}

/// List the catalog.
///
/// # Errors
///
/// Returns 500 if the store fails.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<ProductsResponse>> {
    let products = state.product_service().list().await?;
    Ok(Json(ProductsResponse {
        success: true,
        products,
    }))
}

/// Get one product.
///
/// # Errors
///
/// Returns 404 if the product does not exist.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ProductResponse>> {
    let product = state.product_service().get(&name).await?;
    Ok(Json(product.into()))
}

/// Update a product.
///
/// # Errors
///
/// Returns 400, 404, or 409 per the catalog rules.
#[instrument(skip(state, body))]
pub async fn update(
    State(state): State<AppState>,
    Path(name): Path<String>,
    ApiJson(body): ApiJson<ProductPatch>,
) -> Result<Json<ProductResponse>> {
    let product = state.product_service().update(&name, body).await?;
    Ok(Json(product.into()))
}

/// Delete a product.
///
/// # Errors
///
/// Returns 404 if the product does not exist.
#[instrument(skip(state))]
pub async fn destroy(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ProductResponse>> {
    let product = state.product_service().delete(&name).await?;
    tracing::info!(product = %product.name, "product deleted");
    Ok(Json(ProductResponse {
        success: true,
        message: Some("Product deleted successfully!"),
        product,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::routes::test_support::{app, send};

    async fn seed_users(app: &axum::Router) {
        for (username, role) in [("sam", "seller"), ("alice", "buyer")] {
            let (status, _) = send(
                app,
                Method::POST,
                "/users",
                None,
                Some(json!({
                    "username": username,
                    "name": username,
                    "email": format!("{username}@example.com"),
                    "role": role
                })),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }
    }

    #[tokio::test]
    async fn test_product_lifecycle() {
        let app = app();
        seed_users(&app).await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/products",
            None,
            Some(json!({
                "productName": "Pedigree",
                "category": "Pet Food",
                "price": 19.99,
                "ownerUsername": "sam"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["product"]["productName"], "Pedigree");
        assert_eq!(body["product"]["price"], 19.99);

        let (status, body) = send(
            &app,
            Method::PATCH,
            "/products/Pedigree",
            None,
            Some(json!({ "price": 24.5 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["product"]["price"], 24.5);

        let (status, body) = send(&app, Method::GET, "/products", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["products"].as_array().unwrap().len(), 1);

        let (status, body) = send(&app, Method::DELETE, "/products/Pedigree", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Product deleted successfully!");

        let (status, body) = send(&app, Method::GET, "/products/Pedigree", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Product not found.");
    }

    #[tokio::test]
    async fn test_buyer_cannot_list_products() {
        let app = app();
        seed_users(&app).await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/products",
            None,
            Some(json!({
                "productName": "Pedigree",
                "category": "Pet Food",
                "price": 5,
                "ownerUsername": "alice"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], false);
    }
}
