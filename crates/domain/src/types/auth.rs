//! OAuth credential and token types
//!
//! SaluteSpeech uses a client-credentials style exchange: the client id and
//! secret are sent as HTTP Basic auth together with a scope, and the server
//! answers with an access token and an absolute expiry.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Epoch values below this are read as seconds rather than milliseconds.
///
/// `10^11` milliseconds is March 1973; `10^11` seconds is the year 5138.
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// OAuth scope granted to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OAuthScope {
    /// Individual (personal) accounts.
    #[default]
    #[serde(rename = "SALUTE_SPEECH_PERS")]
    Personal,
    /// Corporate accounts, postpaid.
    #[serde(rename = "SALUTE_SPEECH_CORP")]
    Corporate,
    /// Corporate accounts, prepaid.
    #[serde(rename = "SALUTE_SPEECH_B2B")]
    Business,
}

impl OAuthScope {
    /// Wire value sent in the `scope` form field.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Personal => "SALUTE_SPEECH_PERS",
            Self::Corporate => "SALUTE_SPEECH_CORP",
            Self::Business => "SALUTE_SPEECH_B2B",
        }
    }
}

impl fmt::Display for OAuthScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OAuthScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SALUTE_SPEECH_PERS" => Ok(Self::Personal),
            "SALUTE_SPEECH_CORP" => Ok(Self::Corporate),
            "SALUTE_SPEECH_B2B" => Ok(Self::Business),
            _ => Err(format!("Invalid OAuthScope: {s}")),
        }
    }
}

/// Client credentials for the OAuth exchange.
///
/// Immutable once built. The secret is never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credentials {
    client_id: String,
    client_secret: String,
    scope: OAuthScope,
}

impl Credentials {
    /// Create credentials for the given scope.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        scope: OAuthScope,
    ) -> Self {
        Self { client_id: client_id.into(), client_secret: client_secret.into(), scope }
    }

    /// OAuth client identifier.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// OAuth client secret. Never logged.
    #[must_use]
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// Scope requested in the exchange.
    #[must_use]
    pub const fn scope(&self) -> OAuthScope {
        self.scope
    }

    /// Same credentials with a different scope.
    #[must_use]
    pub fn with_scope(&self, scope: OAuthScope) -> Self {
        Self { scope, ..self.clone() }
    }

    /// Deterministic cache key for this credential triple.
    #[must_use]
    pub fn cache_key(&self) -> String {
        STANDARD.encode(format!("{}:{}:{}", self.client_id, self.client_secret, self.scope))
    }

    /// Value of the `Authorization` header for the OAuth exchange.
    #[must_use]
    pub fn basic_authorization(&self) -> String {
        format!("Basic {}", STANDARD.encode(format!("{}:{}", self.client_id, self.client_secret)))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("scope", &self.scope)
            .finish()
    }
}

/// Access token with its absolute expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenData {
    /// Bearer token sent to the synthesis endpoint.
    pub access_token: String,
    /// Absolute expiry reported by the OAuth server.
    pub expires_at: DateTime<Utc>,
}

impl TokenData {
    /// Token data with an already-resolved expiry.
    pub fn new(access_token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self { access_token: access_token.into(), expires_at }
    }

    /// Build token data from a raw epoch value as returned by the API.
    ///
    /// The API reports milliseconds; values too small to be a plausible
    /// millisecond timestamp are read as seconds. Out-of-range values yield
    /// the Unix epoch, i.e. an already expired token.
    pub fn from_epoch(access_token: impl Into<String>, expires_at: i64) -> Self {
        let expires_at = if expires_at.abs() < MILLIS_THRESHOLD {
            DateTime::from_timestamp(expires_at, 0)
        } else {
            DateTime::from_timestamp_millis(expires_at)
        };
        Self::new(access_token, expires_at.unwrap_or_default())
    }

    /// Whether the token is still usable at `now`, keeping `buffer` in reserve.
    ///
    /// Valid iff `expires_at - buffer > now`.
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>, buffer: Duration) -> bool {
        let buffer = chrono::Duration::from_std(buffer).unwrap_or(chrono::Duration::MAX);
        self.expires_at.checked_sub_signed(buffer).is_some_and(|deadline| deadline > now)
    }

    /// [`Self::is_valid_at`] against the current time.
    #[must_use]
    pub fn is_valid(&self, buffer: Duration) -> bool {
        self.is_valid_at(Utc::now(), buffer)
    }

    /// Seconds until the token expires (negative once expired).
    #[must_use]
    pub fn seconds_until_expiry(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds()
    }
}

impl fmt::Debug for TokenData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenData")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Successful response body of the OAuth endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthResponse {
    /// Issued access token.
    pub access_token: String,
    /// Expiry as a Unix timestamp, usually in milliseconds.
    pub expires_at: i64,
}

impl From<OAuthResponse> for TokenData {
    fn from(response: OAuthResponse) -> Self {
        Self::from_epoch(response.access_token, response.expires_at)
    }
}
