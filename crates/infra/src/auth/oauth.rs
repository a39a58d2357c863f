//! OAuth client for the SaluteSpeech identity endpoint
//!
//! Exchanges client credentials for an access token: form body
//! `scope=<scope>`, HTTP Basic authorization and a fresh `RqUID` per call.
//! Every failure, including transport errors, surfaces as `SaluteError::Auth`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use salutespeech_core::TokenExchanger;
use salutespeech_domain::constants::{DEFAULT_MAX_RETRIES, DEFAULT_OAUTH_URL, DEFAULT_TIMEOUT_MS};
use salutespeech_domain::{Credentials, ErrorDetails, OAuthResponse, Result, SaluteError, TokenData};
use tracing::debug;

use crate::http::{FetchRequest, HttpClient, ResponseData};

/// Header carrying the per-request correlation id.
const RQUID_HEADER: &str = "RqUID";

/// [`TokenExchanger`] backed by the SaluteSpeech OAuth endpoint.
#[derive(Debug, Clone)]
pub struct SaluteOAuthClient {
    http: HttpClient,
    url: String,
    timeout: Duration,
    retries: u32,
}

impl SaluteOAuthClient {
    /// Client for the default production endpoint.
    #[must_use]
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            url: DEFAULT_OAUTH_URL.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Override the OAuth endpoint.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Per-attempt timeout of the exchange.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Retries after transport failures.
    #[must_use]
    pub const fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// OAuth endpoint in use.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TokenExchanger for SaluteOAuthClient {
    async fn exchange(&self, credentials: &Credentials) -> Result<TokenData> {
        if credentials.client_id().is_empty() || credentials.client_secret().is_empty() {
            return Err(SaluteError::auth(
                "Client ID and Client Secret are required for authentication",
            ));
        }

        let rquid = uuid::Uuid::new_v4().to_string();
        debug!(url = %self.url, rquid = %rquid, scope = %credentials.scope(), "requesting access token");

        let request = FetchRequest::post(&self.url)
            .header(AUTHORIZATION.as_str(), credentials.basic_authorization())
            .header(RQUID_HEADER, rquid)
            .header(ACCEPT.as_str(), "application/json")
            .timeout(self.timeout)
            .retries(self.retries);

        let response =
            self.http.fetch_form(request, &[("scope", credentials.scope().as_str())]).await;

        if !response.ok {
            let (status, body) = response
                .error
                .map(|e| ((e.status_code != 0).then_some(e.status_code), e.body))
                .unwrap_or_default();
            return Err(SaluteError::Auth(ErrorDetails::from_parts(
                Some("OAuth authentication failed".to_string()),
                status,
                body,
            )));
        }

        match response.data {
            Some(ResponseData::Json(value)) => {
                let parsed: OAuthResponse = serde_json::from_value(value.clone()).map_err(|e| {
                    SaluteError::auth(format!("Invalid OAuth response: {e}"))
                        .with_status(response.status)
                        .with_body(value)
                })?;
                Ok(parsed.into())
            }
            Some(ResponseData::Text(text)) => {
                let parsed: OAuthResponse = serde_json::from_str(&text).map_err(|e| {
                    SaluteError::auth(format!("Invalid OAuth response: {e}"))
                        .with_status(response.status)
                })?;
                Ok(parsed.into())
            }
            Some(ResponseData::Stream(_)) | None => {
                Err(SaluteError::auth("OAuth response is empty").with_status(response.status))
            }
        }
    }
}
