//! Standardized error types following the `error-gatehouse-<domain>-<number>` format.

use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde_json::json;
use thiserror::Error;

/// Configuration errors that occur during application startup
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Error when a required environment variable is not set
    #[error("error-gatehouse-config-1 {0} must be set")]
    EnvVarRequired(String),

    /// Error when PORT cannot be parsed
    #[error("error-gatehouse-config-2 Parsing HTTP_PORT into u16 failed: {0:?}")]
    PortParsingFailed(std::num::ParseIntError),

    /// Error when version information is not available
    #[error("error-gatehouse-config-3 One of GIT_HASH or CARGO_PKG_VERSION must be set")]
    VersionNotSet,

    /// Error when HTTP client timeout cannot be parsed
    #[error("error-gatehouse-config-4 Failed to parse HTTP client timeout: {0}")]
    TimeoutParsingFailed(std::num::ParseIntError),

    /// Error when duration string cannot be parsed
    #[error("error-gatehouse-config-5 Failed to parse duration '{0}': {1}")]
    DurationParsingFailed(String, String),

    /// Error when boolean string cannot be parsed
    #[error(
        "error-gatehouse-config-6 Failed to parse boolean '{0}': expected true/false/1/0/yes/no/on/off"
    )]
    BoolParsingFailed(String),

    /// Error when an identity provider is missing required credentials.
    /// Deliberately fatal: running with partial credentials silently disables
    /// a login path.
    #[error("error-gatehouse-config-7 Provider '{0}' is missing client credentials")]
    MisconfiguredProvider(String),
}

/// Authentication and OAuth flow errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// The requested identity provider is not registered
    #[error("error-gatehouse-auth-1 Unknown provider: {0}")]
    UnknownProvider(String),

    /// The callback state did not match the in-flight attempt
    #[error("error-gatehouse-auth-2 OAuth state mismatch")]
    StateMismatch,

    /// Token exchange or user-info fetch against the provider failed
    #[error("error-gatehouse-auth-3 Upstream provider call failed: {0}")]
    UpstreamAuthFailure(String),

    /// Device-authorization initiation failed
    #[error("error-gatehouse-auth-4 Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The presented session has passed its expiry
    #[error("error-gatehouse-auth-5 Session expired")]
    SessionExpired,

    /// No session exists for the presented identifier
    #[error("error-gatehouse-auth-6 Session not found")]
    SessionNotFound,

    /// The request carried no usable credentials
    #[error("error-gatehouse-auth-7 Unauthenticated")]
    Unauthenticated,

    /// Underlying storage failure
    #[error("error-gatehouse-auth-8 Storage failure: {0}")]
    Storage(#[from] StorageError),
}

/// Database/storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Error when database connection fails
    #[error("error-gatehouse-storage-1 Database connection failed: {0}")]
    ConnectionFailed(String),

    /// Error when database operation fails
    #[error("error-gatehouse-storage-2 Database error: {0}")]
    DatabaseError(String),

    /// Error when data validation fails
    #[error("error-gatehouse-storage-3 Invalid data: {0}")]
    InvalidData(String),

    /// Error when requested resource is not found
    #[error("error-gatehouse-storage-4 Not found: {0}")]
    NotFound(String),
}

impl IntoResponse for AuthError {
    /// Map flow errors onto HTTP responses.
    ///
    /// Upstream failure detail is logged but never echoed to the client: the
    /// provider error body on the authorization-code path can contain token
    /// material. Device-flow poll outcomes are data, not errors, and never
    /// travel through here.
    fn into_response(self) -> Response {
        let (status, error, description) = match &self {
            AuthError::UnknownProvider(name) => (
                StatusCode::NOT_FOUND,
                "unknown_provider",
                format!("No identity provider named '{}'", name),
            ),
            AuthError::StateMismatch => (
                StatusCode::BAD_REQUEST,
                "invalid_request",
                "The authorization attempt could not be verified".to_string(),
            ),
            AuthError::UpstreamAuthFailure(detail) => {
                tracing::error!(%detail, "upstream provider call failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "upstream_failure",
                    "Sign-in with the identity provider failed".to_string(),
                )
            }
            AuthError::ProviderUnavailable(detail) => {
                tracing::warn!(%detail, "device authorization initiation failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "provider_unavailable",
                    detail.clone(),
                )
            }
            AuthError::SessionExpired => (
                StatusCode::UNAUTHORIZED,
                "session_expired",
                "Session has expired".to_string(),
            ),
            AuthError::SessionNotFound => (
                StatusCode::UNAUTHORIZED,
                "session_not_found",
                "Session not found".to_string(),
            ),
            AuthError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "unauthenticated",
                "Authentication required".to_string(),
            ),
            AuthError::Storage(err) => {
                tracing::error!(error = ?err, "storage failure during authentication");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "server_error",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = json!({
            "error": error,
            "error_description": description,
        });

        (status, axum::Json(body)).into_response()
    }
}
