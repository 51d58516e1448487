//! Request-authentication middleware.
//!
//! Resolves every non-public request to an [`Identity`] before any handler
//! runs, via either a bearer token (validated directly against the provider's
//! user-info endpoint, no session involved) or the session cookie. The
//! resolved identity is injected into request extensions where the
//! [`CurrentUser`] extractor picks it up.

use std::str::FromStr;

use axum::extract::{FromRequestParts, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;
use http::HeaderMap;
use http::request::Parts;

use crate::errors::AuthError;
use crate::http::context::AppState;
use crate::http::utils_cookies::SESSION_COOKIE_NAME;
use crate::oauth::providers::fetch_identity;
use crate::oauth::types::{Identity, Provider};
use crate::storage::traits::SessionValidation;

/// Paths that bypass authentication entirely: the login entry point, the
/// OAuth begin/callback endpoints, the device-flow endpoints (their callers
/// are not authenticated yet), sign-out (which must succeed silently even
/// without a session), and static assets.
pub fn is_public_path(path: &str) -> bool {
    if matches!(path, "/" | "/healthz" | "/auth/login" | "/auth/signout") {
        return true;
    }
    if path.starts_with("/auth/device/") || path.starts_with("/static/") {
        return true;
    }
    if let Some(rest) = path.strip_prefix("/auth/") {
        let mut segments = rest.split('/');
        if let (Some(provider), Some(action), None) =
            (segments.next(), segments.next(), segments.next())
        {
            return Provider::from_str(provider).is_ok()
                && matches!(action, "signin" | "callback");
        }
    }
    false
}

/// Rejection carrying how the caller wants to be told.
///
/// API-style callers get 401 with a JSON body; interactive hypermedia callers
/// are redirected to the login entry point. Which one applies is read off the
/// request headers, so the router never has to special-case it.
pub struct AuthRejection {
    pub kind: AuthError,
    pub interactive: bool,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        if self.interactive {
            Redirect::to("/auth/login").into_response()
        } else {
            self.kind.into_response()
        }
    }
}

/// Authenticated identity extractor for protected handlers.
///
/// Reads the identity the [`authenticate`] middleware placed in request
/// extensions. Handlers behind the middleware can rely on it being present.
#[derive(Clone)]
pub struct CurrentUser(pub Identity);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AuthError::Unauthenticated.into_response())
    }
}

/// Per-request authentication gate, applied to the whole router.
///
/// Resolution order: bearer token, then session cookie. The bearer path does
/// not consult the session store at all.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if is_public_path(request.uri().path()) {
        return next.run(request).await;
    }

    let interactive = wants_interactive_response(request.headers());

    match resolve_identity(&state, request.headers()).await {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(kind) => AuthRejection { kind, interactive }.into_response(),
    }
}

/// A request is interactive when it carries the hypermedia marker header or
/// asks for HTML
fn wants_interactive_response(headers: &HeaderMap) -> bool {
    if headers.contains_key("hx-request") {
        return true;
    }
    headers
        .get("accept")
        .and_then(|value| value.to_str().ok())
        .map(|accept| accept.contains("text/html"))
        .unwrap_or(false)
}

async fn resolve_identity(state: &AppState, headers: &HeaderMap) -> Result<Identity, AuthError> {
    if let Some(token) = bearer_token(headers) {
        return resolve_bearer(state, token).await;
    }

    let jar = CookieJar::from_headers(headers);
    let session_id = jar
        .get(SESSION_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
        .ok_or(AuthError::Unauthenticated)?;

    match state.storage.validate_session(&session_id).await? {
        SessionValidation::Active(session) => Ok(session.user),
        SessionValidation::Expired => Err(AuthError::SessionExpired),
        SessionValidation::NotFound => Err(AuthError::SessionNotFound),
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
}

/// Validate a bearer token against each configured provider's user-info
/// endpoint until one recognizes it.
///
/// Device-flow callers hold raw provider tokens, and nothing in the token
/// itself says which provider minted it. When `bearer_refresh_identity` is
/// set the resolved identity is also upserted, so bearer logins show up in
/// the user store like cookie logins do.
async fn resolve_bearer(state: &AppState, token: &str) -> Result<Identity, AuthError> {
    for provider in state.providers.all() {
        match fetch_identity(&state.http_client, provider, token).await {
            Ok(identity) => {
                if *state.config.bearer_refresh_identity.as_ref() {
                    return Ok(state.storage.upsert_user(&identity).await?);
                }
                return Ok(identity);
            }
            Err(err) => {
                tracing::debug!(provider = %provider.provider, error = %err, "bearer token not accepted");
            }
        }
    }
    Err(AuthError::Unauthenticated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_paths() {
        assert!(is_public_path("/"));
        assert!(is_public_path("/healthz"));
        assert!(is_public_path("/auth/login"));
        assert!(is_public_path("/auth/signout"));
        assert!(is_public_path("/auth/github/signin"));
        assert!(is_public_path("/auth/github/callback"));
        assert!(is_public_path("/auth/google/signin"));
        assert!(is_public_path("/auth/device/initiate"));
        assert!(is_public_path("/auth/device/poll"));
        assert!(is_public_path("/static/styles.css"));
    }

    #[test]
    fn test_protected_paths() {
        assert!(!is_public_path("/api/v1/counter"));
        assert!(!is_public_path("/api/v1/me"));
        assert!(!is_public_path("/auth/gitlab/signin"));
        assert!(!is_public_path("/auth/github/other"));
        assert!(!is_public_path("/auth/github/signin/extra"));
    }

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert("authorization", "Bearer abc123".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc123"));

        headers.insert("authorization", "Basic dXNlcg==".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);

        headers.insert("authorization", "Bearer ".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_interactive_detection() {
        let mut headers = HeaderMap::new();
        assert!(!wants_interactive_response(&headers));

        headers.insert("accept", "application/json".parse().unwrap());
        assert!(!wants_interactive_response(&headers));

        headers.insert("accept", "text/html,application/xhtml+xml".parse().unwrap());
        assert!(wants_interactive_response(&headers));

        let mut hx = HeaderMap::new();
        hx.insert("hx-request", "true".parse().unwrap());
        assert!(wants_interactive_response(&hx));
    }
}
