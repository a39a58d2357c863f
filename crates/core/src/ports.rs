//! Port interfaces implemented by the infra crate
//!
//! The token manager only depends on these traits, so it can be driven by the
//! real OAuth endpoint or by an in-memory double in tests.

use async_trait::async_trait;
use salutespeech_domain::{Credentials, Result, TokenData};

/// Exchanges client credentials for a fresh access token.
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    /// Perform one exchange against the OAuth endpoint.
    ///
    /// # Errors
    /// Implementations return `SaluteError::Auth` for any failed exchange.
    async fn exchange(&self, credentials: &Credentials) -> Result<TokenData>;
}

/// Source of bearer tokens for authenticated API calls.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Return a currently valid access token.
    async fn access_token(&self) -> Result<String>;
}
