//! Identity provider registry and per-provider profile normalization.
//!
//! Each provider exposes a different user-info shape (GitHub: numeric `id`
//! and `login`; Google: `sub`/`id` and `name`). Providers are modeled as a
//! tagged variant with a per-variant mapping into [`Identity`], not as a
//! trait hierarchy.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::config::Config;
use crate::errors::{AuthError, ConfigError};
use crate::oauth::types::{Identity, Provider};

/// Static description of one identity provider: endpoints, credentials,
/// redirect target, and scopes. Immutable after process start.
#[derive(Clone)]
pub struct ProviderConfig {
    pub provider: Provider,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub user_info_endpoint: String,
    pub device_authorization_endpoint: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

impl ProviderConfig {
    /// GitHub provider with its well-known endpoints
    pub fn github(client_id: String, client_secret: String, external_base: &str) -> Self {
        Self {
            provider: Provider::Github,
            authorization_endpoint: "https://github.com/login/oauth/authorize".to_string(),
            token_endpoint: "https://github.com/login/oauth/access_token".to_string(),
            user_info_endpoint: "https://api.github.com/user".to_string(),
            device_authorization_endpoint: "https://github.com/login/device/code".to_string(),
            client_id,
            client_secret,
            redirect_uri: format!("{}/auth/github/callback", external_base),
            scopes: vec!["read:user".to_string(), "user:email".to_string()],
        }
    }

    /// Google provider with its well-known endpoints
    pub fn google(client_id: String, client_secret: String, external_base: &str) -> Self {
        Self {
            provider: Provider::Google,
            authorization_endpoint: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_endpoint: "https://oauth2.googleapis.com/token".to_string(),
            user_info_endpoint: "https://www.googleapis.com/oauth2/v2/userinfo".to_string(),
            device_authorization_endpoint: "https://oauth2.googleapis.com/device/code".to_string(),
            client_id,
            client_secret,
            redirect_uri: format!("{}/auth/google/callback", external_base),
            scopes: vec![
                "https://www.googleapis.com/auth/userinfo.profile".to_string(),
                "https://www.googleapis.com/auth/userinfo.email".to_string(),
            ],
        }
    }

    /// Space-joined scope value for authorization and device requests
    pub fn scope_param(&self) -> String {
        self.scopes.join(" ")
    }
}

/// Registry of all configured providers.
///
/// Construction fails fast with [`ConfigError::MisconfiguredProvider`] when a
/// provider is missing credentials, rather than leaving one login path
/// silently dead.
#[derive(Clone)]
pub struct ProviderRegistry {
    github: ProviderConfig,
    google: ProviderConfig,
}

impl ProviderRegistry {
    pub fn new(github: ProviderConfig, google: ProviderConfig) -> Self {
        Self { github, google }
    }

    /// Build the registry from startup configuration
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let github = ProviderConfig::github(
            require_credential(Provider::Github, config.github.client_id.as_deref())?,
            require_credential(Provider::Github, config.github.client_secret.as_deref())?,
            &config.external_base,
        );
        let google = ProviderConfig::google(
            require_credential(Provider::Google, config.google.client_id.as_deref())?,
            require_credential(Provider::Google, config.google.client_secret.as_deref())?,
            &config.external_base,
        );
        Ok(Self::new(github, google))
    }

    pub fn get(&self, provider: Provider) -> &ProviderConfig {
        match provider {
            Provider::Github => &self.github,
            Provider::Google => &self.google,
        }
    }

    /// All providers in bearer-resolution order
    pub fn all(&self) -> [&ProviderConfig; 2] {
        [&self.github, &self.google]
    }
}

fn require_credential(provider: Provider, value: Option<&str>) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ConfigError::MisconfiguredProvider(
            provider.as_str().to_string(),
        )),
    }
}

/// GitHub user-info response
#[derive(Deserialize)]
struct GithubProfile {
    id: i64,
    login: String,
    name: Option<String>,
    email: Option<String>,
}

/// Google user-info response. The v2 endpoint returns `id`; the OpenID
/// userinfo endpoint returns `sub`. Both are accepted.
#[derive(Deserialize)]
struct GoogleProfile {
    #[serde(alias = "sub")]
    id: String,
    name: Option<String>,
    email: Option<String>,
}

impl Provider {
    /// Normalize a raw user-info response body into an [`Identity`].
    ///
    /// `created_at` is set to `now` here; the user store preserves the
    /// original value on upsert for returning users.
    pub fn map_profile(
        &self,
        raw: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<Identity, AuthError> {
        match self {
            Provider::Github => {
                let profile: GithubProfile = serde_json::from_value(raw).map_err(|e| {
                    AuthError::UpstreamAuthFailure(format!("malformed GitHub profile: {}", e))
                })?;
                let account_id = profile.id.to_string();
                Ok(Identity {
                    id: format!("{}:{}", self, account_id),
                    display_name: profile.name.unwrap_or_else(|| profile.login.clone()),
                    email: profile.email,
                    provider: *self,
                    provider_account_id: account_id,
                    created_at: now,
                    last_login_at: now,
                })
            }
            Provider::Google => {
                let profile: GoogleProfile = serde_json::from_value(raw).map_err(|e| {
                    AuthError::UpstreamAuthFailure(format!("malformed Google profile: {}", e))
                })?;
                let display_name = profile
                    .name
                    .or_else(|| profile.email.clone())
                    .unwrap_or_else(|| profile.id.clone());
                Ok(Identity {
                    id: format!("{}:{}", self, profile.id),
                    display_name,
                    email: profile.email,
                    provider: *self,
                    provider_account_id: profile.id,
                    created_at: now,
                    last_login_at: now,
                })
            }
        }
    }
}

/// Fetch and normalize the profile behind an access token.
///
/// Shared by the authorization-code callback, the device-flow caller, and the
/// bearer path of the authentication middleware; the normalization exists in
/// exactly one place.
pub async fn fetch_identity(
    http: &reqwest::Client,
    provider: &ProviderConfig,
    access_token: &str,
) -> Result<Identity, AuthError> {
    let response = http
        .get(&provider.user_info_endpoint)
        .bearer_auth(access_token)
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|e| AuthError::UpstreamAuthFailure(format!("user-info request failed: {}", e)))?;

    if !response.status().is_success() {
        return Err(AuthError::UpstreamAuthFailure(format!(
            "user-info request returned {}",
            response.status()
        )));
    }

    let raw: serde_json::Value = response
        .json()
        .await
        .map_err(|e| AuthError::UpstreamAuthFailure(format!("user-info body unreadable: {}", e)))?;

    provider.provider.map_profile(raw, Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_github_profile_normalization() {
        let identity = Provider::Github
            .map_profile(
                json!({"id": 583231, "login": "octocat", "name": "The Octocat", "email": null}),
                Utc::now(),
            )
            .unwrap();
        assert_eq!(identity.id, "github:583231");
        assert_eq!(identity.display_name, "The Octocat");
        assert_eq!(identity.provider_account_id, "583231");
        assert_eq!(identity.email, None);
    }

    #[test]
    fn test_github_profile_falls_back_to_login() {
        let identity = Provider::Github
            .map_profile(json!({"id": 1, "login": "octocat", "name": null}), Utc::now())
            .unwrap();
        assert_eq!(identity.display_name, "octocat");
    }

    #[test]
    fn test_google_profile_normalization() {
        let identity = Provider::Google
            .map_profile(
                json!({"sub": "108", "name": "Ada", "email": "ada@example.com"}),
                Utc::now(),
            )
            .unwrap();
        assert_eq!(identity.id, "google:108");
        assert_eq!(identity.display_name, "Ada");
        assert_eq!(identity.email.as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn test_malformed_profile_is_upstream_failure() {
        let result = Provider::Github.map_profile(json!({"login": "no-id"}), Utc::now());
        assert!(matches!(result, Err(AuthError::UpstreamAuthFailure(_))));
    }

    #[test]
    fn test_registry_requires_credentials() {
        let config = Config {
            version: "test".to_string(),
            http_port: "8000".to_string().try_into().unwrap(),
            external_base: "http://localhost:8000".to_string(),
            user_agent: "gatehouse/test".to_string(),
            http_client_timeout: "10s".to_string().try_into().unwrap(),
            session_lifetime: "7d".to_string().try_into().unwrap(),
            cookie_secure: "true".to_string().try_into().unwrap(),
            bearer_refresh_identity: "true".to_string().try_into().unwrap(),
            storage_backend: "memory".to_string(),
            database_url: None,
            github: crate::config::ProviderCredentials {
                client_id: Some("id".to_string()),
                client_secret: Some("secret".to_string()),
            },
            google: crate::config::ProviderCredentials::default(),
        };

        let result = ProviderRegistry::from_config(&config);
        assert!(matches!(
            result,
            Err(ConfigError::MisconfiguredProvider(name)) if name == "google"
        ));
    }
}
