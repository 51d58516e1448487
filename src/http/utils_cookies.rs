//! Session and OAuth-state cookie construction.

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

pub const SESSION_COOKIE_NAME: &str = "session";
pub const STATE_COOKIE_NAME: &str = "oauth_state";

/// Lifetime of the state cookie binding one in-flight authorization attempt
const STATE_COOKIE_TTL: Duration = Duration::minutes(10);

/// Create the state cookie for an authorization request. Scoped to `/auth` so
/// it only travels on the signin/callback round trip.
pub fn state_cookie(state: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((STATE_COOKIE_NAME, state.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/auth".to_string())
        .max_age(STATE_COOKIE_TTL)
        .build()
}

/// Create a removal cookie for the state cookie
pub fn clear_state_cookie() -> Cookie<'static> {
    Cookie::build((STATE_COOKIE_NAME, ""))
        .path("/auth".to_string())
        .max_age(Duration::ZERO)
        .build()
}

/// Create the session cookie
pub fn session_cookie(
    session_id: &str,
    lifetime: chrono::Duration,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, session_id.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/".to_string())
        .max_age(Duration::seconds(lifetime.num_seconds()))
        .build()
}

/// Create a removal cookie for the session
pub fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, ""))
        .path("/".to_string())
        .max_age(Duration::ZERO)
        .build()
}
