//! Device-authorization flow engine (RFC 8628).
//!
//! The engine exposes exactly two operations: request a device/user code
//! pair, and make one token-endpoint poll. It owns no timers and never
//! retries; the caller drives the loop, which keeps the state machine
//! testable without clocks and reusable from a CLI sleep loop or a
//! server-side scheduler alike.

use serde::Deserialize;

use crate::errors::AuthError;
use crate::oauth::providers::ProviderConfig;
use crate::oauth::types::{DeviceAuthorization, PollOutcome, ProviderTokenResponse};

const DEVICE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Token endpoint response during device polling. Providers disagree on HTTP
/// status for pending states (GitHub says 200, Google 4xx), so the body is
/// parsed regardless of status and classified by its fields.
#[derive(Deserialize)]
struct DeviceTokenResponse {
    access_token: Option<String>,
    token_type: Option<String>,
    scope: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

pub struct DeviceFlow {
    http: reqwest::Client,
}

impl DeviceFlow {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Request a device/user code pair from the provider
    pub async fn initiate(
        &self,
        provider: &ProviderConfig,
    ) -> Result<DeviceAuthorization, AuthError> {
        let response = self
            .http
            .post(&provider.device_authorization_endpoint)
            .header("Accept", "application/json")
            .form(&[
                ("client_id", provider.client_id.as_str()),
                ("scope", provider.scope_param().as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                AuthError::ProviderUnavailable(format!("device code request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::ProviderUnavailable(format!(
                "device code request returned {}: {}",
                status, body
            )));
        }

        response.json().await.map_err(|e| {
            AuthError::ProviderUnavailable(format!("device code response unreadable: {}", e))
        })
    }

    /// Make a single token-endpoint poll for `device_code` and classify the
    /// outcome. `Pending`/`SlowDown` mean keep polling (the caller must wait
    /// at least `interval`, stepping up after `SlowDown`); everything else is
    /// terminal.
    pub async fn poll(
        &self,
        provider: &ProviderConfig,
        device_code: &str,
    ) -> Result<PollOutcome, AuthError> {
        let response = self
            .http
            .post(&provider.token_endpoint)
            .header("Accept", "application/json")
            .form(&[
                ("client_id", provider.client_id.as_str()),
                ("client_secret", provider.client_secret.as_str()),
                ("device_code", device_code),
                ("grant_type", DEVICE_GRANT_TYPE),
            ])
            .send()
            .await
            .map_err(|e| {
                AuthError::ProviderUnavailable(format!("device poll request failed: {}", e))
            })?;

        let status = response.status();
        let DeviceTokenResponse {
            access_token,
            token_type,
            scope,
            error,
            error_description,
        } = response.json().await.map_err(|e| {
            AuthError::ProviderUnavailable(format!(
                "device poll response unreadable ({}): {}",
                status, e
            ))
        })?;

        if let Some(access_token) = access_token {
            return Ok(PollOutcome::Approved(ProviderTokenResponse {
                access_token,
                token_type,
                scope,
            }));
        }

        let description =
            |code: &str| error_description.clone().unwrap_or_else(|| code.to_string());

        match error.as_deref() {
            Some("authorization_pending") => Ok(PollOutcome::Pending),
            Some("slow_down") => Ok(PollOutcome::SlowDown),
            Some(code @ "expired_token") => Ok(PollOutcome::Expired(description(code))),
            Some(code) => Ok(PollOutcome::Denied(description(code))),
            None => Err(AuthError::ProviderUnavailable(
                "device poll response missing both token and error".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::types::Provider;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_provider(base: &str) -> ProviderConfig {
        ProviderConfig {
            provider: Provider::Google,
            authorization_endpoint: format!("{}/o/oauth2/v2/auth", base),
            token_endpoint: format!("{}/token", base),
            user_info_endpoint: format!("{}/oauth2/v2/userinfo", base),
            device_authorization_endpoint: format!("{}/device/code", base),
            client_id: "test-client".to_string(),
            client_secret: "test-secret".to_string(),
            redirect_uri: "http://localhost:8000/auth/google/callback".to_string(),
            scopes: vec!["profile".to_string(), "email".to_string()],
        }
    }

    #[tokio::test]
    async fn test_initiate_returns_device_authorization() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/device/code"))
            .and(body_string_contains("client_id=test-client"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "device_code": "dc-123",
                "user_code": "ABCD-EFGH",
                "verification_url": "https://www.google.com/device",
                "expires_in": 1800,
                "interval": 5,
            })))
            .mount(&server)
            .await;

        let flow = DeviceFlow::new(reqwest::Client::new());
        let grant = flow.initiate(&test_provider(&server.uri())).await.unwrap();

        assert_eq!(grant.user_code, "ABCD-EFGH");
        assert_eq!(grant.verification_uri, "https://www.google.com/device");
        assert_eq!(grant.interval, 5);
    }

    #[tokio::test]
    async fn test_initiate_non_2xx_is_provider_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/device/code"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let flow = DeviceFlow::new(reqwest::Client::new());
        let result = flow.initiate(&test_provider(&server.uri())).await;
        assert!(matches!(result, Err(AuthError::ProviderUnavailable(_))));
    }

    #[tokio::test]
    async fn test_poll_classification() {
        let server = MockServer::start().await;
        let flow = DeviceFlow::new(reqwest::Client::new());
        let provider = test_provider(&server.uri());

        // Google reports pending states with a 4xx status; classification
        // must come from the body, not the status line.
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(428).set_body_json(serde_json::json!({
                "error": "authorization_pending",
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        assert_eq!(flow.poll(&provider, "dc").await.unwrap(), PollOutcome::Pending);

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "error": "slow_down",
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        assert_eq!(flow.poll(&provider, "dc").await.unwrap(), PollOutcome::SlowDown);

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "error": "access_denied",
                "error_description": "The user denied the request",
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        assert_eq!(
            flow.poll(&provider, "dc").await.unwrap(),
            PollOutcome::Denied("The user denied the request".to_string())
        );

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "expired_token",
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        assert_eq!(
            flow.poll(&provider, "dc").await.unwrap(),
            PollOutcome::Expired("expired_token".to_string())
        );
    }

    #[tokio::test]
    async fn test_poll_approval_returns_token_once() {
        let server = MockServer::start().await;
        let flow = DeviceFlow::new(reqwest::Client::new());
        let provider = test_provider(&server.uri());

        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=urn"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.token",
                "token_type": "Bearer",
                "scope": "profile email",
            })))
            .mount(&server)
            .await;

        match flow.poll(&provider, "dc").await.unwrap() {
            PollOutcome::Approved(token) => {
                assert_eq!(token.access_token, "ya29.token");
                assert_eq!(token.token_type.as_deref(), Some("Bearer"));
            }
            other => panic!("expected approval, got {:?}", other),
        }
    }
}
