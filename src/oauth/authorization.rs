//! Authorization-code flow engine.
//!
//! Drives the browser redirect dance: build the provider authorization URL
//! with an anti-forgery state value, exchange the callback code for an access
//! token, fetch and normalize the user profile, and materialize a session.

use std::sync::Arc;

use serde::Deserialize;
use url::Url;

use crate::errors::AuthError;
use crate::oauth::providers::{ProviderConfig, fetch_identity};
use crate::oauth::types::{Identity, Session, random_urlsafe};
use crate::storage::traits::AuthStorage;

/// Redirect target plus the state value the HTTP layer must bind to the
/// in-flight attempt (a short-lived cookie) and re-check on callback.
pub struct SignInRedirect {
    pub authorization_url: String,
    pub state: String,
}

/// Token endpoint response for the authorization-code grant. GitHub returns
/// errors with HTTP 200 and an `error` field, so both halves are optional.
#[derive(Deserialize)]
struct CodeExchangeResponse {
    access_token: Option<String>,
    error: Option<String>,
}

pub struct AuthorizationFlow {
    http: reqwest::Client,
    storage: Arc<dyn AuthStorage>,
    session_lifetime: chrono::Duration,
}

impl AuthorizationFlow {
    pub fn new(
        http: reqwest::Client,
        storage: Arc<dyn AuthStorage>,
        session_lifetime: chrono::Duration,
    ) -> Self {
        Self {
            http,
            storage,
            session_lifetime,
        }
    }

    /// Build the provider authorization URL with a freshly generated state
    pub fn begin_sign_in(&self, provider: &ProviderConfig) -> Result<SignInRedirect, AuthError> {
        let state = random_urlsafe(32);

        let mut authorization_url = Url::parse(&provider.authorization_endpoint)
            .map_err(|e| AuthError::UpstreamAuthFailure(format!("bad authorization URL: {}", e)))?;
        authorization_url
            .query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &provider.client_id)
            .append_pair("redirect_uri", &provider.redirect_uri)
            .append_pair("scope", &provider.scope_param())
            .append_pair("state", &state);

        Ok(SignInRedirect {
            authorization_url: authorization_url.into(),
            state,
        })
    }

    /// Complete the provider callback: verify state, exchange the code,
    /// normalize the profile, upsert the user, and persist a new session.
    ///
    /// A state mismatch aborts before any provider call. No failure past that
    /// point creates a session, and the access token is never part of an
    /// error value.
    pub async fn complete_callback(
        &self,
        provider: &ProviderConfig,
        code: &str,
        state: &str,
        expected_state: Option<&str>,
    ) -> Result<Session, AuthError> {
        match expected_state {
            Some(expected) if expected == state => {}
            _ => return Err(AuthError::StateMismatch),
        }

        let access_token = self.exchange_code(provider, code).await?;
        let identity = fetch_identity(&self.http, provider, &access_token).await?;
        self.establish_session(identity).await
    }

    /// Upsert the identity and persist a fresh session for it.
    ///
    /// Also used by device-flow callers once their poll is approved, so both
    /// login paths produce identical records.
    pub async fn establish_session(&self, identity: Identity) -> Result<Session, AuthError> {
        let user = self.storage.upsert_user(&identity).await?;
        let session = Session::new(user, self.session_lifetime);
        self.storage.put_session(&session).await?;
        tracing::info!(user = %session.user.id, "session established");
        Ok(session)
    }

    /// Delete the session, if any. Idempotent: signing out twice, or with no
    /// session at all, succeeds silently.
    pub async fn sign_out(&self, session_id: &str) -> Result<(), AuthError> {
        self.storage.delete_session(session_id).await?;
        Ok(())
    }

    async fn exchange_code(
        &self,
        provider: &ProviderConfig,
        code: &str,
    ) -> Result<String, AuthError> {
        let response = self
            .http
            .post(&provider.token_endpoint)
            .header("Accept", "application/json")
            .form(&[
                ("client_id", provider.client_id.as_str()),
                ("client_secret", provider.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", provider.redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                AuthError::UpstreamAuthFailure(format!("token exchange request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::UpstreamAuthFailure(format!(
                "token exchange returned {}",
                status
            )));
        }

        let payload: CodeExchangeResponse = response.json().await.map_err(|e| {
            AuthError::UpstreamAuthFailure(format!("token exchange body unreadable: {}", e))
        })?;

        if let Some(error) = payload.error {
            return Err(AuthError::UpstreamAuthFailure(format!(
                "token exchange rejected: {}",
                error
            )));
        }

        payload.access_token.ok_or_else(|| {
            AuthError::UpstreamAuthFailure("token exchange response missing access_token".into())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::types::Provider;
    use crate::storage::inmemory::MemoryAuthStorage;
    use crate::storage::traits::SessionStore;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_provider(base: &str) -> ProviderConfig {
        ProviderConfig {
            provider: Provider::Github,
            authorization_endpoint: format!("{}/login/oauth/authorize", base),
            token_endpoint: format!("{}/login/oauth/access_token", base),
            user_info_endpoint: format!("{}/user", base),
            device_authorization_endpoint: format!("{}/login/device/code", base),
            client_id: "test-client".to_string(),
            client_secret: "test-secret".to_string(),
            redirect_uri: "http://localhost:8000/auth/github/callback".to_string(),
            scopes: vec!["read:user".to_string()],
        }
    }

    fn test_flow(storage: Arc<MemoryAuthStorage>) -> AuthorizationFlow {
        AuthorizationFlow::new(reqwest::Client::new(), storage, chrono::Duration::days(7))
    }

    #[tokio::test]
    async fn test_begin_sign_in_carries_state_and_client_id() {
        let flow = test_flow(Arc::new(MemoryAuthStorage::new()));
        let redirect = flow.begin_sign_in(&test_provider("https://github.com")).unwrap();

        let url = Url::parse(&redirect.authorization_url).unwrap();
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs.get("client_id").map(String::as_str), Some("test-client"));
        assert_eq!(pairs.get("state").map(String::as_str), Some(redirect.state.as_str()));
        assert_eq!(pairs.get("response_type").map(String::as_str), Some("code"));

        let again = flow.begin_sign_in(&test_provider("https://github.com")).unwrap();
        assert_ne!(redirect.state, again.state);
    }

    #[tokio::test]
    async fn test_complete_callback_creates_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .and(body_string_contains("code=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "gho_testtoken", "token_type": "bearer", "scope": "read:user",
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 583231, "login": "octocat", "name": "The Octocat", "email": null,
            })))
            .mount(&server)
            .await;

        let storage = Arc::new(MemoryAuthStorage::new());
        let flow = test_flow(storage.clone());
        let session = flow
            .complete_callback(&test_provider(&server.uri()), "abc", "xyz", Some("xyz"))
            .await
            .unwrap();

        assert_eq!(session.user.provider, Provider::Github);
        assert_eq!(session.user.id, "github:583231");
        let stored = storage.get_session(&session.session_id).await.unwrap();
        assert!(stored.is_some());
    }

    #[tokio::test]
    async fn test_state_mismatch_creates_no_session() {
        let server = MockServer::start().await;
        let storage = Arc::new(MemoryAuthStorage::new());
        let flow = test_flow(storage.clone());

        for expected in [Some("other"), None] {
            let result = flow
                .complete_callback(&test_provider(&server.uri()), "abc", "xyz", expected)
                .await;
            assert!(matches!(result, Err(AuthError::StateMismatch)));
        }
        assert_eq!(storage.session_count().await, 0);
        // No provider call should have been made at all
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_exchange_creates_no_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": "bad_verification_code",
            })))
            .mount(&server)
            .await;

        let storage = Arc::new(MemoryAuthStorage::new());
        let flow = test_flow(storage.clone());
        let result = flow
            .complete_callback(&test_provider(&server.uri()), "abc", "xyz", Some("xyz"))
            .await;

        assert!(matches!(result, Err(AuthError::UpstreamAuthFailure(_))));
        assert_eq!(storage.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_returning_user_keeps_created_at() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "gho_testtoken",
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 7, "login": "octocat", "name": null, "email": null,
            })))
            .mount(&server)
            .await;

        let storage = Arc::new(MemoryAuthStorage::new());
        let flow = test_flow(storage.clone());
        let provider = test_provider(&server.uri());

        let first = flow
            .complete_callback(&provider, "abc", "xyz", Some("xyz"))
            .await
            .unwrap();
        let second = flow
            .complete_callback(&provider, "def", "uvw", Some("uvw"))
            .await
            .unwrap();

        assert_eq!(first.user.created_at, second.user.created_at);
        assert!(second.user.last_login_at >= first.user.last_login_at);
        assert_ne!(first.session_id, second.session_id);
    }

    #[tokio::test]
    async fn test_sign_out_is_idempotent() {
        let storage = Arc::new(MemoryAuthStorage::new());
        let flow = test_flow(storage.clone());

        flow.sign_out("nonexistent").await.unwrap();
        flow.sign_out("nonexistent").await.unwrap();
    }
}
