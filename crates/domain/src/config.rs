//! Client configuration structures
//!
//! `SaluteConfig` is the single configuration surface of the client. It can be
//! built programmatically, deserialized from TOML/JSON, or assembled from
//! environment variables by the infra loader.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_MAX_RETRIES, DEFAULT_OAUTH_URL, DEFAULT_REFRESH_BUFFER_SECS, DEFAULT_SYNTHESIS_URL,
    DEFAULT_TIMEOUT_MS, ENV_CLIENT_ID, ENV_CLIENT_SECRET,
};
use crate::errors::{Result, SaluteError};
use crate::types::{Credentials, OAuthScope};

/// SaluteSpeech client configuration
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaluteConfig {
    /// OAuth client id; falls back to `SALUTESPEECH_CLIENT_ID`.
    pub client_id: Option<String>,
    /// OAuth client secret; falls back to `SALUTESPEECH_CLIENT_SECRET`.
    pub client_secret: Option<String>,
    /// OAuth scope of the account.
    pub scope: OAuthScope,
    /// Per-attempt HTTP timeout in seconds.
    pub timeout_secs: u64,
    /// Retries after transport-level failures (not HTTP error statuses).
    pub max_retries: u32,
    /// Tokens are refreshed this many seconds before they expire.
    pub refresh_buffer_secs: u64,
    /// OAuth token endpoint.
    pub oauth_url: String,
    /// Synthesis endpoint.
    pub synthesis_url: String,
    /// Extra headers sent with every synthesis request.
    pub headers: BTreeMap<String, String>,
    /// Accept TLS certificates that do not chain to a public root.
    ///
    /// The API endpoints are signed by the Russian Trusted Root CA, which is
    /// absent from most trust stores. Prefer installing that CA.
    pub accept_invalid_certs: bool,
}

impl Default for SaluteConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            scope: OAuthScope::default(),
            timeout_secs: DEFAULT_TIMEOUT_MS / 1000,
            max_retries: DEFAULT_MAX_RETRIES,
            refresh_buffer_secs: DEFAULT_REFRESH_BUFFER_SECS,
            oauth_url: DEFAULT_OAUTH_URL.to_string(),
            synthesis_url: DEFAULT_SYNTHESIS_URL.to_string(),
            headers: BTreeMap::new(),
            accept_invalid_certs: false,
        }
    }
}

impl SaluteConfig {
    /// Configuration with explicit credentials and defaults elsewhere.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: Some(client_id.into()),
            client_secret: Some(client_secret.into()),
            ..Self::default()
        }
    }

    /// Set the OAuth scope.
    #[must_use]
    pub const fn with_scope(mut self, scope: OAuthScope) -> Self {
        self.scope = scope;
        self
    }

    /// Set the per-attempt timeout.
    #[must_use]
    pub const fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the retry count.
    #[must_use]
    pub const fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the token refresh buffer.
    #[must_use]
    pub const fn with_refresh_buffer_secs(mut self, secs: u64) -> Self {
        self.refresh_buffer_secs = secs;
        self
    }

    /// Override the OAuth endpoint.
    #[must_use]
    pub fn with_oauth_url(mut self, url: impl Into<String>) -> Self {
        self.oauth_url = url.into();
        self
    }

    /// Override the synthesis endpoint.
    #[must_use]
    pub fn with_synthesis_url(mut self, url: impl Into<String>) -> Self {
        self.synthesis_url = url.into();
        self
    }

    /// Add a header sent with every synthesis request.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// See [`Self::accept_invalid_certs`].
    #[must_use]
    pub const fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// `timeout_secs` as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// `refresh_buffer_secs` as a [`Duration`].
    #[must_use]
    pub const fn refresh_buffer(&self) -> Duration {
        Duration::from_secs(self.refresh_buffer_secs)
    }

    /// Resolve credentials, falling back to `lookup` for missing values.
    ///
    /// `lookup` is usually `std::env::var(..).ok()`; it is injected so callers
    /// (and tests) control where fallbacks come from.
    ///
    /// # Errors
    /// Returns `SaluteError::Generic` when either value is still missing.
    pub fn resolve_credentials<F>(&self, lookup: F) -> Result<Credentials>
    where
        F: Fn(&str) -> Option<String>,
    {
        let client_id = self.client_id.clone().or_else(|| lookup(ENV_CLIENT_ID));
        let client_secret = self.client_secret.clone().or_else(|| lookup(ENV_CLIENT_SECRET));

        match (client_id, client_secret) {
            (Some(id), Some(secret)) => Ok(Credentials::new(id, secret, self.scope)),
            _ => Err(SaluteError::generic(format!(
                "Please provide client_id and client_secret or set {ENV_CLIENT_ID} and \
                 {ENV_CLIENT_SECRET} environment variables."
            ))),
        }
    }
}

impl fmt::Debug for SaluteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaluteConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("scope", &self.scope)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("refresh_buffer_secs", &self.refresh_buffer_secs)
            .field("oauth_url", &self.oauth_url)
            .field("synthesis_url", &self.synthesis_url)
            .field("headers", &self.headers)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .finish()
    }
}
