//! Per-user counter API and identity introspection.
//!
//! The counter is the application feature riding on top of the auth core; it
//! exists here as the consumer that exercises the middleware contract.

use axum::Json;
use axum::extract::State;
use serde_json::json;

use crate::errors::AuthError;
use crate::http::context::AppState;
use crate::http::middleware_auth::CurrentUser;
use crate::oauth::types::Identity;

/// GET /api/v1/me - the authenticated identity
pub async fn handle_me(CurrentUser(user): CurrentUser) -> Json<Identity> {
    Json(user)
}

/// GET /api/v1/counter
pub async fn handle_get_counter(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<serde_json::Value>, AuthError> {
    let count = state.storage.get_counter(&user.id).await?;
    Ok(Json(json!({ "count": count })))
}

/// POST /api/v1/counter/increment
pub async fn handle_increment_counter(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<serde_json::Value>, AuthError> {
    let count = state.storage.increment_counter(&user.id).await?;
    Ok(Json(json!({ "count": count })))
}

/// POST /api/v1/counter/decrement - decrements floor at zero
pub async fn handle_decrement_counter(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<serde_json::Value>, AuthError> {
    let count = state.storage.decrement_counter(&user.id).await?;
    Ok(Json(json!({ "count": count })))
}
