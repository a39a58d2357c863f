//! Configuration loader
//!
//! Builds a [`SaluteConfig`] from environment variables and config files.
//!
//! ## Loading Strategy
//! 1. Loads a `.env` file from the working directory, if present
//! 2. Uses a config file as the base when one is found (see below)
//! 3. Applies environment variables on top; the environment always wins
//!
//! ## Environment Variables
//! - `SALUTESPEECH_CLIENT_ID` / `SALUTESPEECH_CLIENT_SECRET`: credentials
//! - `SALUTESPEECH_SCOPE`: `SALUTE_SPEECH_PERS`, `SALUTE_SPEECH_CORP` or
//!   `SALUTE_SPEECH_B2B`
//! - `SALUTESPEECH_TIMEOUT_SECS`: per-attempt timeout in seconds
//! - `SALUTESPEECH_MAX_RETRIES`: transport retries
//! - `SALUTESPEECH_REFRESH_BUFFER_SECS`: token refresh buffer in seconds
//! - `SALUTESPEECH_OAUTH_URL` / `SALUTESPEECH_SYNTHESIS_URL`: endpoints
//! - `SALUTESPEECH_ACCEPT_INVALID_CERTS`: `true`/`false`
//!
//! ## File Locations
//! 1. The path in `SALUTESPEECH_CONFIG`
//! 2. `./salutespeech.toml`, then `./salutespeech.json`

use std::path::{Path, PathBuf};
use std::str::FromStr;

use salutespeech_domain::constants::{
    CONFIG_FILE_CANDIDATES, ENV_ACCEPT_INVALID_CERTS, ENV_CLIENT_ID, ENV_CLIENT_SECRET,
    ENV_CONFIG_PATH, ENV_MAX_RETRIES, ENV_OAUTH_URL, ENV_REFRESH_BUFFER_SECS, ENV_SCOPE,
    ENV_SYNTHESIS_URL, ENV_TIMEOUT_SECS,
};
use salutespeech_domain::{OAuthScope, Result, SaluteConfig, SaluteError};

/// Load configuration from `.env`, an optional config file and the environment.
///
/// # Errors
/// Returns `SaluteError::Generic` if a config file exists but cannot be
/// parsed, or an environment variable has an invalid value.
pub fn load() -> Result<SaluteConfig> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "Failed to read .env file"),
    }

    let base = match probe_config_paths(env_lookup) {
        Some(path) => load_from_file(path)?,
        None => {
            tracing::debug!("No config file found, using defaults");
            SaluteConfig::default()
        }
    };

    let config = apply_overrides(base, env_lookup)?;
    tracing::info!(
        scope = %config.scope,
        has_credentials = config.client_id.is_some() && config.client_secret.is_some(),
        "Configuration loaded"
    );
    Ok(config)
}

/// Load configuration from environment variables only.
///
/// Unset variables keep their defaults; nothing is required at this stage.
/// Credentials are checked when the client is built.
///
/// # Errors
/// Returns `SaluteError::Generic` for malformed values.
pub fn load_from_env() -> Result<SaluteConfig> {
    apply_overrides(SaluteConfig::default(), env_lookup)
}

/// Load configuration from a TOML or JSON file (detected by extension).
///
/// # Errors
/// Returns `SaluteError::Generic` if the file is missing, unreadable, or
/// malformed.
pub fn load_from_file(path: impl AsRef<Path>) -> Result<SaluteConfig> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(SaluteError::generic(format!("Config file not found: {}", path.display())));
    }

    tracing::info!(path = %path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(path)
        .map_err(|e| SaluteError::generic(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, path)
}

/// Find the first config file candidate that exists.
///
/// `lookup` resolves environment variables (normally `std::env::var`).
pub fn probe_config_paths<F>(lookup: F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(explicit) = lookup(ENV_CONFIG_PATH).filter(|p| !p.trim().is_empty()) {
        return Some(PathBuf::from(explicit));
    }

    let cwd = std::env::current_dir().ok()?;
    CONFIG_FILE_CANDIDATES.iter().map(|name| cwd.join(name)).find(|path| path.exists())
}

/// Apply environment-style overrides from `lookup` on top of `config`.
///
/// # Errors
/// Returns `SaluteError::Generic` naming the first malformed variable.
pub fn apply_overrides<F>(mut config: SaluteConfig, lookup: F) -> Result<SaluteConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(id) = var(ENV_CLIENT_ID) {
        config.client_id = Some(id);
    }
    if let Some(secret) = var(ENV_CLIENT_SECRET) {
        config.client_secret = Some(secret);
    }
    if let Some(scope) = var(ENV_SCOPE) {
        config.scope = scope.parse::<OAuthScope>().map_err(|e| invalid(ENV_SCOPE, &e))?;
    }
    if let Some(value) = var(ENV_TIMEOUT_SECS) {
        config.timeout_secs = parse_number(ENV_TIMEOUT_SECS, &value)?;
    }
    if let Some(value) = var(ENV_MAX_RETRIES) {
        config.max_retries = parse_number(ENV_MAX_RETRIES, &value)?;
    }
    if let Some(value) = var(ENV_REFRESH_BUFFER_SECS) {
        config.refresh_buffer_secs = parse_number(ENV_REFRESH_BUFFER_SECS, &value)?;
    }
    if let Some(url) = var(ENV_OAUTH_URL) {
        config.oauth_url = url;
    }
    if let Some(url) = var(ENV_SYNTHESIS_URL) {
        config.synthesis_url = url;
    }
    if let Some(value) = var(ENV_ACCEPT_INVALID_CERTS) {
        config.accept_invalid_certs = parse_bool(ENV_ACCEPT_INVALID_CERTS, &value)?;
    }

    Ok(config)
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn parse_config(contents: &str, path: &Path) -> Result<SaluteConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| SaluteError::generic(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| SaluteError::generic(format!("Invalid JSON format: {e}"))),
        _ => Err(SaluteError::generic(format!("Unsupported config format: {extension}"))),
    }
}

fn parse_number<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse::<T>().map_err(|e| invalid(key, &e))
}

/// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive).
fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(invalid(key, &format!("expected a boolean, got {other:?}"))),
    }
}

fn invalid(key: &str, reason: &dyn std::fmt::Display) -> SaluteError {
    SaluteError::generic(format!("Invalid value for {key}: {reason}"))
}
