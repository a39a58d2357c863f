//! Request and response types for [`HttpClient::fetch`](super::HttpClient::fetch)

use std::fmt;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures::Stream;
use reqwest::Method;
use salutespeech_domain::constants::{DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_MS};
use salutespeech_domain::SaluteError;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Status text of synthetic failures that never reached the server.
pub const REQUEST_FAILED: &str = "Request Failed";

/// Live response body, yielded chunk by chunk.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, SaluteError>> + Send>>;

/// A single logical HTTP call, possibly spanning several attempts.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL without the query part.
    pub url: String,
    /// Per-request headers, applied over the client defaults.
    pub headers: Vec<(String, String)>,
    /// Raw request body.
    pub body: Option<Bytes>,
    /// Query parameters, percent-encoded when the URL is built.
    pub query: Vec<(String, String)>,
    /// Upper bound for each attempt.
    pub timeout: Duration,
    /// Additional attempts after transport-level failures.
    pub retries: u32,
    /// Aborts the call, including any pending backoff.
    pub cancel: Option<CancellationToken>,
}

impl FetchRequest {
    /// Request with default timeout and no retries.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            query: Vec::new(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            retries: DEFAULT_MAX_RETRIES,
            cancel: None,
        }
    }

    /// `GET` request to `url`.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// `POST` request to `url`.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// Set a header, replacing an earlier value with the same name.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    /// Set several headers at once.
    #[must_use]
    pub fn headers<I, K, V>(self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        headers.into_iter().fold(self, |request, (name, value)| request.header(name, value))
    }

    /// Set the request body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Append one query parameter.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Append several query parameters.
    #[must_use]
    pub fn query_params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query.extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Per-attempt timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Retries after transport-level failures.
    #[must_use]
    pub const fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Abort the call when `token` is cancelled.
    #[must_use]
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Body of a successful response, classified by content type.
pub enum ResponseData {
    /// `application/json` (or a `+json` suffix).
    Json(Value),
    /// Any `text/*` type.
    Text(String),
    /// Everything else, streamed without buffering.
    Stream(ByteStream),
}

impl fmt::Debug for ResponseData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Why a fetch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// The server answered with a non-2xx status.
    Http,
    /// Connection, TLS or decode failure on the last attempt.
    Transport,
    /// The last attempt exceeded its timeout.
    Timeout,
    /// The caller cancelled the request.
    Aborted,
}

/// Why a fetch did not succeed.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchError {
    /// Failure category.
    pub kind: FetchErrorKind,
    /// Human-readable description, e.g. `HTTP 404: Not Found`.
    pub message: String,
    /// HTTP status, or `0` when no response was received.
    pub status_code: u16,
    /// Best-effort parsed error body.
    pub body: Option<Value>,
}

impl FetchError {
    pub(crate) fn http(status: u16, reason: &str, body: Option<Value>) -> Self {
        Self {
            kind: FetchErrorKind::Http,
            message: format!("HTTP {status}: {reason}"),
            status_code: status,
            body,
        }
    }

    pub(crate) fn transport(message: impl Into<String>) -> Self {
        Self { kind: FetchErrorKind::Transport, message: message.into(), status_code: 0, body: None }
    }

    pub(crate) fn timeout() -> Self {
        Self {
            kind: FetchErrorKind::Timeout,
            message: "Request timed out".to_string(),
            status_code: 0,
            body: None,
        }
    }

    pub(crate) fn aborted() -> Self {
        Self {
            kind: FetchErrorKind::Aborted,
            message: "Request aborted".to_string(),
            status_code: 0,
            body: None,
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Outcome of [`HttpClient::fetch`](super::HttpClient::fetch).
///
/// Failures are data, not `Err`: callers decide how a status maps to their
/// own error kinds.
#[derive(Debug)]
pub struct FetchResponse {
    /// `true` for a 2xx response.
    pub ok: bool,
    /// HTTP status, or `0` when no response was received.
    pub status: u16,
    /// Canonical reason phrase, or `Request Failed` without a response.
    pub status_text: String,
    /// Decoded body of a successful response.
    pub data: Option<ResponseData>,
    /// Set whenever `ok` is `false`.
    pub error: Option<FetchError>,
}

impl FetchResponse {
    pub(crate) fn success(status: u16, status_text: impl Into<String>, data: Option<ResponseData>) -> Self {
        Self { ok: true, status, status_text: status_text.into(), data, error: None }
    }

    pub(crate) fn http_failure(status: u16, status_text: impl Into<String>, error: FetchError) -> Self {
        Self { ok: false, status, status_text: status_text.into(), data: None, error: Some(error) }
    }

    /// Failure without an HTTP response (status 0).
    pub(crate) fn failed(error: FetchError) -> Self {
        Self::http_failure(0, REQUEST_FAILED, error)
    }

    /// Kind of the failure, if any.
    #[must_use]
    pub fn error_kind(&self) -> Option<FetchErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let request = FetchRequest::post("https://example.test");
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.timeout, Duration::from_secs(30));
        assert_eq!(request.retries, 0);
        assert!(request.cancel.is_none());
    }

    #[test]
    fn header_replaces_case_insensitively() {
        let request = FetchRequest::get("https://example.test")
            .header("Content-Type", "text/plain")
            .header("content-type", "application/text");

        assert_eq!(request.headers, vec![("content-type".to_string(), "application/text".to_string())]);
    }

    #[test]
    fn synthetic_failures_have_status_zero() {
        let response = FetchResponse::failed(FetchError::timeout());
        assert!(!response.ok);
        assert_eq!(response.status, 0);
        assert_eq!(response.status_text, REQUEST_FAILED);
        assert_eq!(response.error_kind(), Some(FetchErrorKind::Timeout));
    }

    #[test]
    fn http_error_message() {
        let error = FetchError::http(404, "Not Found", None);
        assert_eq!(error.to_string(), "HTTP 404: Not Found");
    }
}
