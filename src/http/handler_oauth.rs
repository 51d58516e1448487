//! Authorization-code flow handlers: signin redirect, provider callback, and
//! sign-out.

use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use crate::errors::AuthError;
use crate::http::context::AppState;
use crate::http::utils_cookies::{
    SESSION_COOKIE_NAME, STATE_COOKIE_NAME, clear_session_cookie, clear_state_cookie,
    session_cookie, state_cookie,
};
use crate::oauth::types::Provider;

/// Query parameters of the provider callback
#[derive(Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// GET /auth/{provider}/signin - redirect the browser to the provider's
/// authorization endpoint, binding the state value in a short-lived cookie
pub async fn handle_signin(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    jar: CookieJar,
) -> Result<Response, AuthError> {
    let provider: Provider = provider.parse()?;
    let redirect = state
        .authorization_flow
        .begin_sign_in(state.providers.get(provider))?;

    let jar = jar.add(state_cookie(
        &redirect.state,
        *state.config.cookie_secure.as_ref(),
    ));

    Ok((jar, Redirect::to(&redirect.authorization_url)).into_response())
}

/// GET /auth/{provider}/callback - complete the flow: verify state, exchange
/// the code, persist the session, and set the session cookie
pub async fn handle_callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
) -> Result<Response, AuthError> {
    let provider: Provider = provider.parse()?;

    if let Some(error) = query.error {
        // The provider declined before issuing a code. Description stays in
        // the log; the client gets the generic failure.
        return Err(AuthError::UpstreamAuthFailure(format!(
            "provider returned error '{}': {}",
            error,
            query.error_description.unwrap_or_default()
        )));
    }

    let code = query.code.ok_or_else(|| {
        AuthError::UpstreamAuthFailure("callback missing authorization code".to_string())
    })?;
    let callback_state = query.state.ok_or(AuthError::StateMismatch)?;
    let expected_state = jar
        .get(STATE_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string());

    let session = state
        .authorization_flow
        .complete_callback(
            state.providers.get(provider),
            &code,
            &callback_state,
            expected_state.as_deref(),
        )
        .await?;

    let jar = jar.remove(clear_state_cookie()).add(session_cookie(
        &session.session_id,
        *state.config.session_lifetime.as_ref(),
        *state.config.cookie_secure.as_ref(),
    ));

    Ok((jar, Redirect::to("/")).into_response())
}

/// POST /auth/signout - delete the cookie session, if any.
///
/// Idempotent by contract: no session, or a session already gone, still
/// reports success.
pub async fn handle_signout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Response, AuthError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE_NAME) {
        state.authorization_flow.sign_out(cookie.value()).await?;
    }

    let jar = jar.remove(clear_session_cookie());
    Ok((jar, axum::Json(serde_json::json!({ "success": true }))).into_response())
}

/// GET /auth/login - login entry point, also the redirect target for
/// unauthenticated interactive requests
pub async fn handle_login_page() -> Html<&'static str> {
    Html(
        "<!DOCTYPE html><html><body><h1>Sign in</h1>\
         <p><a href=\"/auth/github/signin\">Sign in with GitHub</a></p>\
         <p><a href=\"/auth/google/signin\">Sign in with Google</a></p>\
         </body></html>",
    )
}
