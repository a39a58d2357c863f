//! Error types used throughout the SaluteSpeech client
//!
//! Every failure surfaced to callers is a [`SaluteError`]. The variants are the
//! error *kinds* callers dispatch on; all of them share the same payload
//! ([`ErrorDetails`]) so status codes and raw bodies can be inspected without
//! matching on the variant first.
//!
//! | Kind | Raised for |
//! |------|------------|
//! | `Generic` | Validation failures, unexpected HTTP statuses, empty bodies |
//! | `Auth` | 401/403, missing credentials, failed OAuth exchange |
//! | `RateLimit` | 429 |
//! | `Timeout` | Transport timed out after all retries |

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Prefix used when an error is built without an explicit message.
const FALLBACK_PREFIX: &str = "SaluteSpeechError";

/// Payload shared by every error kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Human-readable description.
    pub message: String,

    /// HTTP status code, when the failure came from an HTTP response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,

    /// Best-effort parsed response body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl ErrorDetails {
    /// Create details carrying only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), status_code: None, body: None }
    }

    /// Build details from optional parts.
    ///
    /// When `message` is `None` the message is derived from the status and
    /// body, e.g. `SaluteSpeechError (500): {"message":"boom"}`.
    #[must_use]
    pub fn from_parts(message: Option<String>, status_code: Option<u16>, body: Option<Value>) -> Self {
        let message = message.unwrap_or_else(|| describe(status_code, body.as_ref()));
        Self { message, status_code, body }
    }
}

impl fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

fn describe(status_code: Option<u16>, body: Option<&Value>) -> String {
    let mut message = FALLBACK_PREFIX.to_string();

    if let Some(status) = status_code {
        message.push_str(&format!(" ({status})"));
    }

    match body {
        Some(Value::String(text)) => message.push_str(&format!(": {text}")),
        Some(other) => message.push_str(&format!(": {other}")),
        None => {}
    }

    message
}

/// Kind of a [`SaluteError`], for dispatch without destructuring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unexpected or unclassified failure.
    Generic,
    /// Authentication or authorization failure.
    Auth,
    /// The API rejected the call because of rate limiting.
    RateLimit,
    /// The request exceeded its timeout after all retries.
    Timeout,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generic => write!(f, "Generic Error"),
            Self::Auth => write!(f, "Authentication Error"),
            Self::RateLimit => write!(f, "Rate Limit Error"),
            Self::Timeout => write!(f, "Timeout Error"),
        }
    }
}

/// Main error type for the SaluteSpeech client
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum SaluteError {
    /// Any failure without a more specific category.
    #[error("{0}")]
    Generic(ErrorDetails),

    /// Rejected credentials or token (401/403, failed OAuth exchange).
    #[error("{0}")]
    Auth(ErrorDetails),

    /// Server-side throttling (429).
    #[error("{0}")]
    RateLimit(ErrorDetails),

    /// No response within the configured timeout.
    #[error("{0}")]
    Timeout(ErrorDetails),
}

impl SaluteError {
    /// Generic error with a message.
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic(ErrorDetails::new(message))
    }

    /// Authentication error with a message.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(ErrorDetails::new(message))
    }

    /// Rate-limit error with a message.
    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::RateLimit(ErrorDetails::new(message))
    }

    /// Timeout error; defaults to "Request timed out".
    pub fn timeout(message: Option<String>) -> Self {
        Self::Timeout(ErrorDetails::new(message.unwrap_or_else(|| "Request timed out".into())))
    }

    /// Attach an HTTP status code.
    #[must_use]
    pub fn with_status(self, status_code: u16) -> Self {
        self.with_status_opt(Some(status_code))
    }

    /// Attach an HTTP status code when one is known.
    #[must_use]
    pub fn with_status_opt(mut self, status_code: Option<u16>) -> Self {
        self.details_mut().status_code = status_code;
        self
    }

    /// Attach a response body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Option<Value>>) -> Self {
        self.details_mut().body = body.into();
        self
    }

    /// The kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Generic(_) => ErrorKind::Generic,
            Self::Auth(_) => ErrorKind::Auth,
            Self::RateLimit(_) => ErrorKind::RateLimit,
            Self::Timeout(_) => ErrorKind::Timeout,
        }
    }

    /// Shared payload.
    #[must_use]
    pub const fn details(&self) -> &ErrorDetails {
        match self {
            Self::Generic(d) | Self::Auth(d) | Self::RateLimit(d) | Self::Timeout(d) => d,
        }
    }

    fn details_mut(&mut self) -> &mut ErrorDetails {
        match self {
            Self::Generic(d) | Self::Auth(d) | Self::RateLimit(d) | Self::Timeout(d) => d,
        }
    }

    /// Human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.details().message
    }

    /// HTTP status code, if any.
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        self.details().status_code
    }

    /// Parsed response body, if any.
    #[must_use]
    pub const fn body(&self) -> Option<&Value> {
        self.details().body.as_ref()
    }

    /// Whether retrying the same call later might succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::RateLimit | ErrorKind::Timeout)
    }
}

/// Result type alias for SaluteSpeech operations
pub type Result<T> = std::result::Result<T, SaluteError>;
