//! Client constants
//!
//! Centralized location for endpoints, limits and defaults used by the
//! SaluteSpeech client.

// Endpoints
/// Production OAuth endpoint.
pub const DEFAULT_OAUTH_URL: &str = "https://ngw.devices.sberbank.ru:9443/api/v2/oauth";
/// Production synthesis endpoint.
pub const DEFAULT_SYNTHESIS_URL: &str = "https://smartspeech.sber.ru/rest/v1/text:synthesize";

// Synthesis limits
/// Longest accepted text, in characters.
pub const MAX_TEXT_LENGTH: usize = 4000;

// Token lifecycle
/// Tokens expiring sooner than this are refreshed.
pub const DEFAULT_REFRESH_BUFFER_SECS: u64 = 300;

// Transport
/// Per-attempt request timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
/// Retries after transport-level failures.
pub const DEFAULT_MAX_RETRIES: u32 = 0;
/// Delay before the first retry; doubles per attempt.
pub const BASE_BACKOFF_MS: u64 = 1_000;
/// Upper bound on the retry delay.
pub const MAX_BACKOFF_MS: u64 = 10_000;

// SDK identification headers
/// Value of the `X-SDK-Name` header.
pub const SDK_NAME: &str = "salutespeech-rs";
/// Value of the `X-SDK-Version` header.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

// Environment variables
/// OAuth client id.
pub const ENV_CLIENT_ID: &str = "SALUTESPEECH_CLIENT_ID";
/// OAuth client secret.
pub const ENV_CLIENT_SECRET: &str = "SALUTESPEECH_CLIENT_SECRET";
/// OAuth scope, e.g. `SALUTE_SPEECH_CORP`.
pub const ENV_SCOPE: &str = "SALUTESPEECH_SCOPE";
/// Per-attempt timeout in seconds.
pub const ENV_TIMEOUT_SECS: &str = "SALUTESPEECH_TIMEOUT_SECS";
/// Retry count.
pub const ENV_MAX_RETRIES: &str = "SALUTESPEECH_MAX_RETRIES";
/// Token refresh buffer in seconds.
pub const ENV_REFRESH_BUFFER_SECS: &str = "SALUTESPEECH_REFRESH_BUFFER_SECS";
/// OAuth endpoint override.
pub const ENV_OAUTH_URL: &str = "SALUTESPEECH_OAUTH_URL";
/// Synthesis endpoint override.
pub const ENV_SYNTHESIS_URL: &str = "SALUTESPEECH_SYNTHESIS_URL";
/// Disables TLS certificate validation when truthy.
pub const ENV_ACCEPT_INVALID_CERTS: &str = "SALUTESPEECH_ACCEPT_INVALID_CERTS";
/// Explicit path of a TOML or JSON config file.
pub const ENV_CONFIG_PATH: &str = "SALUTESPEECH_CONFIG";

/// Config files probed in the working directory, in order.
pub const CONFIG_FILE_CANDIDATES: &[&str] = &["salutespeech.toml", "salutespeech.json"];
