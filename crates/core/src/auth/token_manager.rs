//! Token manager with single-flight refresh
//!
//! Manages the access token lifecycle:
//! - In-memory cache keyed by credential triple (id, secret, scope)
//! - Refresh before expiry (configurable buffer, default 5 min)
//! - At most one outstanding exchange per cache key; concurrent callers
//!   share its outcome
//!
//! The cache and the in-flight registry live behind one `parking_lot::Mutex`
//! that is never held across an `.await`. A refresh is a `Shared` future that
//! deregisters itself and stores its token under a single lock acquisition,
//! so it completes correctly even if the caller that started it is dropped.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use salutespeech_domain::constants::DEFAULT_REFRESH_BUFFER_SECS;
use salutespeech_domain::{Credentials, Result, TokenData};
use tracing::{debug, info, warn};

use crate::ports::{AccessTokenProvider, TokenExchanger};

type PendingRefresh = Shared<BoxFuture<'static, Result<TokenData>>>;

#[derive(Default)]
struct TokenState {
    tokens: HashMap<String, TokenData>,
    in_flight: HashMap<String, PendingRefresh>,
}

/// Caching token manager
///
/// Cheap to clone; clones share the same cache and in-flight registry.
#[derive(Clone)]
pub struct TokenManager {
    credentials: Credentials,
    exchanger: Arc<dyn TokenExchanger>,
    refresh_buffer: Duration,
    state: Arc<Mutex<TokenState>>,
}

impl TokenManager {
    /// Create a token manager for `credentials`.
    ///
    /// # Arguments
    /// * `credentials` - Default credential triple used by [`Self::get_token`]
    /// * `exchanger` - Performs the actual OAuth exchange
    #[must_use]
    pub fn new(credentials: Credentials, exchanger: Arc<dyn TokenExchanger>) -> Self {
        Self {
            credentials,
            exchanger,
            refresh_buffer: Duration::from_secs(DEFAULT_REFRESH_BUFFER_SECS),
            state: Arc::new(Mutex::new(TokenState::default())),
        }
    }

    /// Refresh tokens this long before they expire.
    #[must_use]
    pub const fn with_refresh_buffer(mut self, buffer: Duration) -> Self {
        self.refresh_buffer = buffer;
        self
    }

    /// How long before expiry a cached token stops being served.
    #[must_use]
    pub const fn refresh_buffer(&self) -> Duration {
        self.refresh_buffer
    }

    /// Credentials used by [`Self::get_token`].
    #[must_use]
    pub const fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Get a valid access token for the configured credentials.
    ///
    /// Served from cache when possible; otherwise joins or starts a refresh.
    ///
    /// # Errors
    /// Returns `SaluteError::Auth` when the exchange fails. Failures are not
    /// cached; the next call starts a new exchange.
    pub async fn get_token(&self) -> Result<String> {
        self.token_for(&self.credentials).await
    }

    /// Get a valid access token for an arbitrary credential triple.
    ///
    /// Shares the cache and the single-flight registry with
    /// [`Self::get_token`].
    ///
    /// # Errors
    /// See [`Self::get_token`].
    pub async fn token_for(&self, credentials: &Credentials) -> Result<String> {
        let key = credentials.cache_key();

        let pending = {
            let mut state = self.state.lock();

            if let Some(token) =
                state.tokens.get(&key).filter(|token| token.is_valid(self.refresh_buffer))
            {
                debug!(expires_in_secs = token.seconds_until_expiry(), "Using cached access token");
                return Ok(token.access_token.clone());
            }

            if let Some(pending) = state.in_flight.get(&key) {
                debug!("Joining in-flight token refresh");
                pending.clone()
            } else {
                let pending = self.start_refresh(key.clone(), credentials.clone());
                state.in_flight.insert(key, pending.clone());
                pending
            }
        };

        pending.await.map(|token| token.access_token)
    }

    /// Cached token for the configured credentials, without any I/O.
    ///
    /// Returns the entry even when it is inside the refresh buffer.
    #[must_use]
    pub fn cached_token(&self) -> Option<TokenData> {
        self.state.lock().tokens.get(&self.credentials.cache_key()).cloned()
    }

    /// Drop every cached token. In-flight refreshes are left alone.
    pub fn clear_cache(&self) {
        let mut state = self.state.lock();
        let cleared = state.tokens.len();
        state.tokens.clear();
        debug!(cleared, "Cleared token cache");
    }

    fn start_refresh(&self, key: String, credentials: Credentials) -> PendingRefresh {
        let exchanger = Arc::clone(&self.exchanger);
        let state = Arc::clone(&self.state);

        async move {
            info!(scope = %credentials.scope(), "Refreshing access token");
            let result = exchanger.exchange(&credentials).await;

            {
                let mut state = state.lock();
                state.in_flight.remove(&key);
                if let Ok(token) = &result {
                    state.tokens.insert(key, token.clone());
                }
            }

            match &result {
                Ok(token) => {
                    info!(expires_at = %token.expires_at, "Access token refreshed");
                }
                Err(e) => warn!(error = %e, "Access token refresh failed"),
            }

            result
        }
        .boxed()
        .shared()
    }
}

impl fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("credentials", &self.credentials)
            .field("refresh_buffer", &self.refresh_buffer)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl AccessTokenProvider for TokenManager {
    async fn access_token(&self) -> Result<String> {
        self.get_token().await
    }
}
