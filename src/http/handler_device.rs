//! Device-authorization flow handlers (RFC 8628).
//!
//! These endpoints proxy the provider's device endpoints for non-interactive
//! callers. Unlike the authorization-code path, provider error codes and
//! descriptions pass through verbatim: the poll response is machine-read by
//! the polling caller, and contains no token material.

use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::Deserialize;
use serde_json::json;

use crate::errors::AuthError;
use crate::http::context::AppState;
use crate::oauth::types::{PollOutcome, Provider};

#[derive(Deserialize)]
pub struct DeviceInitiateRequest {
    pub provider: Provider,
}

#[derive(Deserialize)]
pub struct DevicePollRequest {
    pub provider: Provider,
    pub device_code: String,
}

/// POST /auth/device/initiate - request a device/user code pair from the
/// provider and relay it to the caller
pub async fn handle_device_initiate(
    State(state): State<AppState>,
    Json(body): Json<DeviceInitiateRequest>,
) -> Result<Response, AuthError> {
    let grant = state
        .device_flow
        .initiate(state.providers.get(body.provider))
        .await?;

    Ok(Json(grant).into_response())
}

/// POST /auth/device/poll - make one token-endpoint poll on behalf of the
/// caller.
///
/// Pending states answer 200 so the caller keeps polling; terminal provider
/// errors answer 400 with the provider's description.
pub async fn handle_device_poll(
    State(state): State<AppState>,
    Json(body): Json<DevicePollRequest>,
) -> Result<Response, AuthError> {
    let outcome = state
        .device_flow
        .poll(state.providers.get(body.provider), &body.device_code)
        .await?;

    let response = match outcome {
        PollOutcome::Approved(token) => Json(token).into_response(),
        PollOutcome::Pending => {
            Json(json!({ "error": "authorization_pending" })).into_response()
        }
        PollOutcome::SlowDown => Json(json!({ "error": "slow_down" })).into_response(),
        PollOutcome::Denied(description) | PollOutcome::Expired(description) => {
            (StatusCode::BAD_REQUEST, Json(json!({ "error": description }))).into_response()
        }
    };

    Ok(response)
}
