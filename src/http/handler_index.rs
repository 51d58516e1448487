//! Index and health handlers.

use axum::extract::State;
use axum::response::Html;

use crate::http::context::AppState;

/// GET / - landing page
pub async fn handle_index() -> Html<&'static str> {
    Html("<!DOCTYPE html><html><body><a href=\"/auth/login\">Sign in</a></body></html>")
}

/// GET /healthz - liveness probe reporting the running version
pub async fn handle_healthz(State(state): State<AppState>) -> String {
    state.config.version.clone()
}
