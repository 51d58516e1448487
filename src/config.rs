//! Environment-based configuration types for gatehouse server runtime settings.

use anyhow::Result;
use std::time::Duration;

use crate::errors::ConfigError;

/// HTTP server port configuration
#[derive(Clone)]
pub struct HttpPort(u16);

/// HTTP client timeout configuration
#[derive(Clone)]
pub struct HttpClientTimeout(Duration);

/// Session lifetime configuration
#[derive(Clone)]
pub struct SessionLifetime(chrono::Duration);

/// Boolean flag parsed from the environment
#[derive(Clone)]
pub struct EnvFlag(bool);

/// Client credentials for one identity provider, absent until validated by the
/// provider registry
#[derive(Clone, Default)]
pub struct ProviderCredentials {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// Main application configuration
#[derive(Clone)]
pub struct Config {
    pub version: String,
    pub http_port: HttpPort,
    pub external_base: String,
    pub user_agent: String,
    pub http_client_timeout: HttpClientTimeout,
    pub session_lifetime: SessionLifetime,
    pub cookie_secure: EnvFlag,
    pub bearer_refresh_identity: EnvFlag,
    pub storage_backend: String,
    pub database_url: Option<String>,
    pub github: ProviderCredentials,
    pub google: ProviderCredentials,
}

impl Config {
    /// Create a new configuration from environment variables
    pub fn new() -> Result<Self> {
        let default_user_agent = format!("gatehouse/{}", version()?);

        let external_base = default_env("EXTERNAL_BASE", "http://localhost:8000");
        let http_client_timeout: HttpClientTimeout =
            default_env("HTTP_CLIENT_TIMEOUT", "10s").try_into()?;
        let http_port: HttpPort = default_env("HTTP_PORT", "8000").try_into()?;
        let session_lifetime: SessionLifetime = default_env("SESSION_LIFETIME", "7d").try_into()?;
        let cookie_secure: EnvFlag = default_env("COOKIE_SECURE", "true").try_into()?;
        let bearer_refresh_identity: EnvFlag =
            default_env("BEARER_REFRESH_IDENTITY", "true").try_into()?;
        let storage_backend = default_env("STORAGE_BACKEND", "memory");
        let database_url = optional_env("DATABASE_URL");
        let user_agent = default_env("USER_AGENT", &default_user_agent);

        let github = ProviderCredentials {
            client_id: optional_env("GITHUB_CLIENT_ID"),
            client_secret: optional_env("GITHUB_CLIENT_SECRET"),
        };
        let google = ProviderCredentials {
            client_id: optional_env("GOOGLE_CLIENT_ID"),
            client_secret: optional_env("GOOGLE_CLIENT_SECRET"),
        };

        Ok(Self {
            version: version()?,
            http_port,
            external_base,
            user_agent,
            http_client_timeout,
            session_lifetime,
            cookie_secure,
            bearer_refresh_identity,
            storage_backend,
            database_url,
            github,
            google,
        })
    }
}

/// Get application version from build environment
pub fn version() -> Result<String> {
    option_env!("GIT_HASH")
        .or(option_env!("CARGO_PKG_VERSION"))
        .map(|val| val.to_string())
        .ok_or(ConfigError::VersionNotSet.into())
}

pub(crate) fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn default_env(name: &str, default_value: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default_value.to_string())
}

impl TryFrom<String> for HttpPort {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            Ok(Self(8000))
        } else {
            value
                .parse::<u16>()
                .map(Self)
                .map_err(|err| ConfigError::PortParsingFailed(err).into())
        }
    }
}

impl AsRef<u16> for HttpPort {
    fn as_ref(&self) -> &u16 {
        &self.0
    }
}

impl TryFrom<String> for HttpClientTimeout {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Ok(Self(Duration::from_secs(10)));
        }

        // Parse duration strings like "10s", "5m", etc.
        if value.ends_with('s') {
            let seconds = value
                .trim_end_matches('s')
                .parse::<u64>()
                .map_err(ConfigError::TimeoutParsingFailed)?;
            Ok(Self(Duration::from_secs(seconds)))
        } else if value.ends_with('m') {
            let minutes = value
                .trim_end_matches('m')
                .parse::<u64>()
                .map_err(ConfigError::TimeoutParsingFailed)?;
            Ok(Self(Duration::from_secs(minutes * 60)))
        } else {
            // Default to seconds if no suffix
            let seconds = value
                .parse::<u64>()
                .map_err(ConfigError::TimeoutParsingFailed)?;
            Ok(Self(Duration::from_secs(seconds)))
        }
    }
}

impl AsRef<Duration> for HttpClientTimeout {
    fn as_ref(&self) -> &Duration {
        &self.0
    }
}

impl TryFrom<String> for SessionLifetime {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let duration = duration_str::parse(&value)
            .map_err(|e| ConfigError::DurationParsingFailed(value, e.to_string()))?;
        Ok(Self(chrono::Duration::from_std(duration)?))
    }
}

impl AsRef<chrono::Duration> for SessionLifetime {
    fn as_ref(&self) -> &chrono::Duration {
        &self.0
    }
}

impl TryFrom<String> for EnvFlag {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Self(true)),
            "false" | "0" | "no" | "off" => Ok(Self(false)),
            _ => Err(ConfigError::BoolParsingFailed(value).into()),
        }
    }
}

impl AsRef<bool> for EnvFlag {
    fn as_ref(&self) -> &bool {
        &self.0
    }
}
