//! User route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;
use tracing::instrument;

use super::ApiJson;
use crate::error::Result;
use crate::models::User;
use crate::services::{NewUserInput, UserPatch};
use crate::state::AppState;

/// Response carrying one user.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: User,
}

/// Response carrying every user.
#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub success: bool,
    pub users: Vec<User>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            success: true,
            user,
        }
    }
}

/// Register a user.
///
/// # Errors
///
/// Returns 400 on validation failure and 409 if the username is taken.
#[instrument(skip(state, body))]
pub async fn create(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<NewUserInput>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    let user = state.user_service().create(body).await?;
    tracing::info!(username = %user.username, role = %user.role, "user registered");
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// List users.
///
/// # Errors
///
/// Returns 500 if the store fails.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<UsersResponse>> {
    let users = state.user_service().list().await?;
    Ok(Json(UsersResponse {
        success: true,
        users,
    }))
}

/// Get one user.
///
/// # Errors
///
/// Returns 404 if the user does not exist.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<UserResponse>> {
    let user = state.user_service().get(&username).await?;
    Ok(Json(user.into()))
}

/// Update or rename a user.
///
/// # Errors
///
/// Returns 400, 404, or 409 per the user rules.
#[instrument(skip(state, body))]
pub async fn update(
    State(state): State<AppState>,
    Path(username): Path<String>,
    ApiJson(body): ApiJson<UserPatch>,
) -> Result<Json<UserResponse>> {
    let user = state.user_service().update(&username, body).await?;
    Ok(Json(user.into()))
}
