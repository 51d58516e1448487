//! Main router configuration assembling the authentication and API endpoints.

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use super::{
    context::AppState,
    handler_counter::{
        handle_decrement_counter, handle_get_counter, handle_increment_counter, handle_me,
    },
    handler_device::{handle_device_initiate, handle_device_poll},
    handler_index::{handle_healthz, handle_index},
    handler_oauth::{handle_callback, handle_login_page, handle_signin, handle_signout},
    middleware_auth::authenticate,
};

/// Build the application router.
///
/// The authentication middleware wraps every route; public paths are let
/// through by the `is_public_path` predicate it consults.
pub fn build_router(ctx: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/login", get(handle_login_page))
        .route("/signout", post(handle_signout))
        .route("/{provider}/signin", get(handle_signin))
        .route("/{provider}/callback", get(handle_callback))
        .route("/device/initiate", post(handle_device_initiate))
        .route("/device/poll", post(handle_device_poll));

    let api_routes = Router::new()
        .route("/me", get(handle_me))
        .route("/counter", get(handle_get_counter))
        .route("/counter/increment", post(handle_increment_counter))
        .route("/counter/decrement", post(handle_decrement_counter));

    Router::new()
        .route("/", get(handle_index))
        .route("/healthz", get(handle_healthz))
        .nest("/auth", auth_routes)
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn_with_state(ctx.clone(), authenticate))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::Config;
    use crate::oauth::types::Provider;
    use crate::oauth::{ProviderConfig, ProviderRegistry};
    use crate::storage::inmemory::MemoryAuthStorage;
    use std::sync::Arc;

    /// Provider config pointed at a test server instead of the real provider
    pub(crate) fn test_provider_config(provider: Provider, base: &str) -> ProviderConfig {
        let mut config = match provider {
            Provider::Github => ProviderConfig::github(
                "test-github-client".to_string(),
                "test-github-secret".to_string(),
                "http://localhost:8000",
            ),
            Provider::Google => ProviderConfig::google(
                "test-google-client".to_string(),
                "test-google-secret".to_string(),
                "http://localhost:8000",
            ),
        };
        config.authorization_endpoint = format!("{}/{}/authorize", base, provider);
        config.token_endpoint = format!("{}/{}/token", base, provider);
        config.user_info_endpoint = format!("{}/{}/userinfo", base, provider);
        config.device_authorization_endpoint = format!("{}/{}/device/code", base, provider);
        config
    }

    pub(crate) fn test_config() -> Config {
        Config {
            version: "test".to_string(),
            http_port: "8000".to_string().try_into().unwrap(),
            external_base: "http://localhost:8000".to_string(),
            user_agent: "gatehouse/test".to_string(),
            http_client_timeout: "10s".to_string().try_into().unwrap(),
            session_lifetime: "7d".to_string().try_into().unwrap(),
            cookie_secure: "false".to_string().try_into().unwrap(),
            bearer_refresh_identity: "true".to_string().try_into().unwrap(),
            storage_backend: "memory".to_string(),
            database_url: None,
            github: crate::config::ProviderCredentials {
                client_id: Some("test-github-client".to_string()),
                client_secret: Some("test-github-secret".to_string()),
            },
            google: crate::config::ProviderCredentials {
                client_id: Some("test-google-client".to_string()),
                client_secret: Some("test-google-secret".to_string()),
            },
        }
    }

    fn create_test_app_state() -> AppState {
        let registry = ProviderRegistry::new(
            test_provider_config(Provider::Github, "http://localhost:9"),
            test_provider_config(Provider::Google, "http://localhost:9"),
        );
        AppState::new(
            reqwest::Client::new(),
            Arc::new(test_config()),
            Arc::new(registry),
            Arc::new(MemoryAuthStorage::new()),
        )
    }

    #[test]
    fn test_build_router_structure() {
        let app_state = create_test_app_state();
        let _router = build_router(app_state);
        // Just verify that the router builds without panicking
        // This tests the middleware setup and route configuration
    }
}
