//! Shared types for the authentication and session subsystem.

use base64::prelude::*;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::AuthError;

/// Identity providers supported by this deployment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Github,
    Google,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Github => "github",
            Provider::Google => "google",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = AuthError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "github" => Ok(Provider::Github),
            "google" => Ok(Provider::Google),
            other => Err(AuthError::UnknownProvider(other.to_string())),
        }
    }
}

/// A user as known to this deployment, normalized across providers.
///
/// `id` is provider-qualified (`github:583231`) so accounts from different
/// providers never collide. Created on first successful authentication;
/// `last_login_at` is refreshed on every subsequent login.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub display_name: String,
    pub email: Option<String>,
    pub provider: Provider,
    pub provider_account_id: String,
    pub created_at: DateTime<Utc>,
    pub last_login_at: DateTime<Utc>,
}

/// Server-side session record.
///
/// Invariant: `expires_at > created_at`. The identifier carries 256 bits of
/// entropy and is never reused.
#[derive(Clone, Serialize, Deserialize)]
#[cfg_attr(any(debug_assertions, test), derive(Debug))]
pub struct Session {
    pub session_id: String,
    pub user: Identity,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Create a new session for `user` with a fresh opaque identifier
    pub fn new(user: Identity, lifetime: chrono::Duration) -> Self {
        let now = Utc::now();
        Self {
            session_id: random_urlsafe(32),
            user,
            created_at: now,
            expires_at: now + lifetime,
        }
    }
}

/// Token payload returned by a provider's token endpoint
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(any(debug_assertions, test), derive(Debug))]
pub struct ProviderTokenResponse {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Device authorization grant issued by a provider's device endpoint.
///
/// Held only in the polling caller's memory for the duration of one
/// authentication attempt. Google spells the verification field
/// `verification_url`; the alias folds both spellings into one shape.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeviceAuthorization {
    pub device_code: String,
    pub user_code: String,
    #[serde(alias = "verification_url")]
    pub verification_uri: String,
    pub expires_in: u64,
    #[serde(default = "default_poll_interval")]
    pub interval: u64,
}

fn default_poll_interval() -> u64 {
    5
}

/// Classified result of a single device-flow token poll.
///
/// `Pending` and `SlowDown` are protocol states, not failures: the caller
/// waits at least `interval` seconds (plus a fixed step after `SlowDown`)
/// before polling again. `Denied` and `Expired` carry the provider's own
/// description verbatim and are terminal.
#[derive(Clone, PartialEq)]
#[cfg_attr(any(debug_assertions, test), derive(Debug))]
pub enum PollOutcome {
    Approved(ProviderTokenResponse),
    Pending,
    SlowDown,
    Denied(String),
    Expired(String),
}

/// Generate `len` random bytes encoded as unpadded URL-safe base64.
///
/// Used for OAuth state values and session identifiers; 32 bytes gives 256
/// bits of entropy.
pub fn random_urlsafe(len: usize) -> String {
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.r#gen()).collect();
    BASE64_URL_SAFE_NO_PAD.encode(bytes)
}
