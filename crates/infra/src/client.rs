//! Top-level SaluteSpeech client
//!
//! Wires configuration, the HTTP transport, the OAuth exchanger and the token
//! manager together, and hands out the synthesis client.

use std::sync::{Arc, OnceLock};

use salutespeech_core::{AccessTokenProvider, TokenExchanger, TokenManager};
use salutespeech_domain::{Result, SaluteConfig};
use tracing::debug;

use crate::auth::SaluteOAuthClient;
use crate::http::HttpClient;
use crate::tts::TextToSpeechClient;

/// Entry point of the SDK.
///
/// Owns one [`TokenManager`]; several clients with different credentials can
/// coexist without sharing token state.
#[derive(Debug)]
pub struct SaluteSpeechClient {
    config: SaluteConfig,
    http: HttpClient,
    token_manager: TokenManager,
    text_to_speech: OnceLock<TextToSpeechClient>,
}

impl SaluteSpeechClient {
    /// Build a client from `config`.
    ///
    /// Missing credentials fall back to `SALUTESPEECH_CLIENT_ID` and
    /// `SALUTESPEECH_CLIENT_SECRET`.
    ///
    /// # Errors
    /// Returns `SaluteError::Generic` when credentials cannot be resolved or
    /// the HTTP client cannot be built.
    pub fn new(config: SaluteConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .connect_timeout(config.timeout())
            .accept_invalid_certs(config.accept_invalid_certs)
            .build()?;
        Self::with_http_client(config, http)
    }

    /// Build a client from `.env`, config files and the environment.
    ///
    /// # Errors
    /// See [`crate::config::load`] and [`Self::new`].
    pub fn from_env() -> Result<Self> {
        Self::new(crate::config::load()?)
    }

    /// Build a client on top of a caller-supplied reqwest client.
    ///
    /// # Errors
    /// Returns `SaluteError::Generic` when credentials cannot be resolved.
    pub fn with_reqwest_client(config: SaluteConfig, client: reqwest::Client) -> Result<Self> {
        Self::with_http_client(config, HttpClient::from_reqwest(client))
    }

    /// Build a client on top of an existing [`HttpClient`].
    ///
    /// # Errors
    /// Returns `SaluteError::Generic` when credentials cannot be resolved.
    pub fn with_http_client(config: SaluteConfig, http: HttpClient) -> Result<Self> {
        Self::build(config, http, |key| std::env::var(key).ok())
    }

    pub(crate) fn build<F>(config: SaluteConfig, http: HttpClient, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials = config.resolve_credentials(lookup)?;

        let exchanger = SaluteOAuthClient::new(http.clone())
            .with_url(config.oauth_url.clone())
            .with_timeout(config.timeout())
            .with_retries(config.max_retries);
        let exchanger: Arc<dyn TokenExchanger> = Arc::new(exchanger);
        let token_manager =
            TokenManager::new(credentials, exchanger).with_refresh_buffer(config.refresh_buffer());

        debug!(
            scope = %config.scope,
            oauth_url = %config.oauth_url,
            synthesis_url = %config.synthesis_url,
            "SaluteSpeech client created"
        );

        Ok(Self { config, http, token_manager, text_to_speech: OnceLock::new() })
    }

    /// Synthesis client, created on first use.
    pub fn text_to_speech(&self) -> &TextToSpeechClient {
        self.text_to_speech.get_or_init(|| {
            let provider: Arc<dyn AccessTokenProvider> = Arc::new(self.token_manager.clone());
            TextToSpeechClient::new(self.http.clone())
                .with_url(self.config.synthesis_url.clone())
                .with_token_provider(provider)
                .with_headers(self.config.headers.clone())
                .with_timeout(self.config.timeout())
                .with_max_retries(self.config.max_retries)
        })
    }

    /// Token manager shared by every request of this client.
    #[must_use]
    pub const fn token_manager(&self) -> &TokenManager {
        &self.token_manager
    }

    /// Configuration the client was built from.
    #[must_use]
    pub const fn config(&self) -> &SaluteConfig {
        &self.config
    }
}
