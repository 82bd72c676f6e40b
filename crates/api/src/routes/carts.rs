//! Cart route handlers.
//!
//! Every handler needs an [`ActingUser`]; the cart service checks that the
//! actor owns the cart before anything else happens.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use super::ApiJson;
use crate::error::{AppError, Result};
use crate::middleware::ActingUser;
use crate::models::{Cart, CartPayload};
use crate::state::AppState;

/// Body of add and update requests.
///
/// `quantity` is kept raw so that a bad value surfaces as an invalid
/// quantity after authorization rather than as a malformed body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineRequest {
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub quantity: Value,
}

/// Body of remove requests.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveRequest {
    #[serde(default)]
    pub product_name: String,
}

/// Response carrying a cart.
#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub cart: CartPayload,
}

impl CartResponse {
    fn new(cart: &Cart, message: Option<&'static str>) -> Self {
        Self {
            success: true,
            message,
            cart: cart.into(),
        }
    }
}

/// Coerce a JSON quantity to an integer.
///
/// Integers pass through, floats are truncated, and numeric strings are
/// parsed. Anything else becomes `0`.
#[allow(clippy::cast_possible_truncation)] // saturating float-to-int cast
fn coerce_quantity(value: &Value) -> i64 {
    fn from_float(f: f64) -> i64 {
        f.trunc() as i64
    }

    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(from_float)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(from_float))
        }
        _ => None,
    }
    .unwrap_or(0)
}

/// Get the buyer's cart, creating it on first access.
///
/// # Errors
///
/// Returns 404 for an unknown user and 403 for a seller or another actor.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(username): Path<String>,
    ActingUser(acting): ActingUser,
) -> Result<Json<CartResponse>> {
    let cart = state.cart_service().get_cart(&username, &acting).await?;
    Ok(Json(CartResponse::new(&cart, None)))
}

/// Add a product to the cart.
///
/// # Errors
///
/// Returns 400 for a bad quantity or missing product name and 404 for an
/// unknown product, after the access checks.
#[instrument(skip(state, body))]
pub async fn add(
    State(state): State<AppState>,
    Path(username): Path<String>,
    ActingUser(acting): ActingUser,
    ApiJson(body): ApiJson<CartLineRequest>,
) -> Result<(StatusCode, Json<CartResponse>)> {
    let quantity = coerce_quantity(&body.quantity);
    let cart = state
        .cart_service()
        .add_to_cart(&username, &acting, &body.product_name, quantity)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CartResponse::new(&cart, Some("Item added to cart"))),
    ))
}

/// Set the quantity of a cart line.
///
/// # Errors
///
/// Returns 400 for a bad quantity or missing product name and 404 when the
/// cart or line does not exist, after the access checks.
#[instrument(skip(state, body))]
pub async fn update(
    State(state): State<AppState>,
    Path(username): Path<String>,
    ActingUser(acting): ActingUser,
    ApiJson(body): ApiJson<CartLineRequest>,
) -> Result<Json<CartResponse>> {
    let quantity = coerce_quantity(&body.quantity);
    let cart = state
        .cart_service()
        .update_cart_item_quantity(&username, &acting, &body.product_name, quantity)
        .await?;

    Ok(Json(CartResponse::new(&cart, Some("Cart item updated"))))
}

/// Remove a product from the cart.
///
/// # Errors
///
/// Returns 400 for a missing product name and 404 when the cart or line does
/// not exist, after the access checks. An absent or unreadable body counts
/// as a missing product name.
#[instrument(skip(state, body))]
pub async fn remove(
    State(state): State<AppState>,
    Path(username): Path<String>,
    ActingUser(acting): ActingUser,
    body: std::result::Result<ApiJson<RemoveRequest>, AppError>,
) -> Result<Json<CartResponse>> {
    let body = body.map(|ApiJson(body)| body).unwrap_or_default();
    let cart = state
        .cart_service()
        .remove_from_cart(&username, &acting, &body.product_name)
        .await?;

    Ok(Json(CartResponse::new(&cart, Some("Item removed from cart"))))
}
