use std::time::Duration;

use bytes::Bytes;
use futures::TryStreamExt;
use reqwest::header::{HeaderMap, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client as ReqwestClient, Response, Url};
use salutespeech_domain::constants::{BASE_BACKOFF_MS, MAX_BACKOFF_MS};
use salutespeech_domain::{Result, SaluteError};
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::headers::{merge_headers, sdk_headers};
use super::types::{FetchError, FetchRequest, FetchResponse, ResponseData};

/// HTTP client with per-attempt timeouts and transport-level retries.
///
/// HTTP error statuses are never retried; they come back as a failed
/// [`FetchResponse`].
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    default_headers: Vec<(String, String)>,
    base_backoff: Duration,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("default_headers", &self.default_headers)
            .field("base_backoff", &self.base_backoff)
            .finish_non_exhaustive()
    }
}

/// Why a single attempt failed.
enum AttemptFailure {
    Timeout,
    Transport(String),
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Convenience constructor with default configuration.
    ///
    /// # Errors
    /// Fails when the TLS backend cannot be initialised.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Wrap an existing reqwest client, e.g. one with a custom root store.
    ///
    /// SDK identification headers are still added to every request.
    #[must_use]
    pub fn from_reqwest(client: ReqwestClient) -> Self {
        Self {
            client,
            default_headers: sdk_headers(),
            base_backoff: Duration::from_millis(BASE_BACKOFF_MS),
        }
    }

    /// Execute a request with timeout, retry and cancellation semantics.
    ///
    /// Never returns `Err`: every outcome, including exhausted retries, is
    /// described by the returned [`FetchResponse`].
    pub async fn fetch(&self, request: FetchRequest) -> FetchResponse {
        let url = match build_url(&request.url, &request.query) {
            Ok(url) => url,
            Err(message) => return FetchResponse::failed(FetchError::transport(message)),
        };
        let layers = [self.default_headers.as_slice(), request.headers.as_slice()];
        let headers = match merge_headers(&layers) {
            Ok(headers) => headers,
            Err(message) => return FetchResponse::failed(FetchError::transport(message)),
        };

        let attempts = request.retries.saturating_add(1);
        let mut last_failure = FetchError::transport("Request failed");

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.backoff_delay(attempt);
                warn!(attempt, ?delay, %url, error = %last_failure, "retrying HTTP request");
                let slept = run_cancellable(request.cancel.as_ref(), tokio::time::sleep(delay)).await;
                if slept.is_none() {
                    return aborted(&url);
                }
            }

            debug!(attempt = attempt + 1, method = %request.method, %url, "sending HTTP request");
            let outcome = run_cancellable(
                request.cancel.as_ref(),
                self.attempt(&request, url.clone(), headers.clone()),
            )
            .await;

            match outcome {
                None => return aborted(&url),
                Some(Ok(response)) => {
                    debug!(attempt = attempt + 1, %url, status = response.status, "received HTTP response");
                    return response;
                }
                Some(Err(AttemptFailure::Timeout)) => {
                    debug!(attempt = attempt + 1, %url, timeout = ?request.timeout, "HTTP request timed out");
                    last_failure = FetchError::timeout();
                }
                Some(Err(AttemptFailure::Transport(message))) => {
                    debug!(attempt = attempt + 1, %url, error = %message, "HTTP request failed");
                    last_failure = FetchError::transport(message);
                }
            }
        }

        FetchResponse::failed(last_failure)
    }

    /// POST an `application/x-www-form-urlencoded` body.
    pub async fn fetch_form<K, V>(&self, request: FetchRequest, form: &[(K, V)]) -> FetchResponse
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let body = encode_pairs(form);

        let request = FetchRequest { method: reqwest::Method::POST, ..request }
            .header(CONTENT_TYPE.as_str(), "application/x-www-form-urlencoded")
            .body(body);
        self.fetch(request).await
    }

    /// POST a JSON body.
    pub async fn fetch_json<T>(&self, request: FetchRequest, body: &T) -> FetchResponse
    where
        T: Serialize + ?Sized,
    {
        let body = match serde_json::to_vec(body) {
            Ok(body) => body,
            Err(e) => {
                return FetchResponse::failed(FetchError::transport(format!(
                    "Failed to serialize request body: {e}"
                )))
            }
        };

        let request = FetchRequest { method: reqwest::Method::POST, ..request }
            .header(CONTENT_TYPE.as_str(), "application/json")
            .body(body);
        self.fetch(request).await
    }

    /// POST a raw text body, as the synthesis endpoint expects.
    pub async fn fetch_stream(&self, request: FetchRequest, text: impl Into<String>) -> FetchResponse {
        let request = FetchRequest { method: reqwest::Method::POST, ..request }
            .header(CONTENT_TYPE.as_str(), "application/text")
            .body(Bytes::from(text.into()));
        self.fetch(request).await
    }

    /// Delay before retry number `retry_number` (1-based): base, 2x base, 4x
    /// base and so on, capped at ten seconds.
    #[must_use]
    pub fn backoff_delay(&self, retry_number: u32) -> Duration {
        let shift = retry_number.saturating_sub(1).min(16);
        let multiplier = 1u32 << shift;
        self.base_backoff.saturating_mul(multiplier).min(Duration::from_millis(MAX_BACKOFF_MS))
    }

    async fn attempt(
        &self,
        request: &FetchRequest,
        url: Url,
        headers: HeaderMap,
    ) -> std::result::Result<FetchResponse, AttemptFailure> {
        let mut builder = self.client.request(request.method.clone(), url).headers(headers);
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let work = async {
            let response = builder.send().await.map_err(describe_error)?;
            read_response(response).await
        };

        tokio::time::timeout(request.timeout, work).await.unwrap_or(Err(AttemptFailure::Timeout))
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    connect_timeout: Option<Duration>,
    base_backoff: Duration,
    user_agent: Option<String>,
    default_headers: Vec<(String, String)>,
    accept_invalid_certs: bool,
    no_proxy: bool,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            connect_timeout: None,
            base_backoff: Duration::from_millis(BASE_BACKOFF_MS),
            user_agent: None,
            default_headers: Vec::new(),
            accept_invalid_certs: false,
            no_proxy: false,
        }
    }
}

impl HttpClientBuilder {
    /// Bound connection establishment. Whole-request timeouts are per
    /// [`FetchRequest`] so streamed bodies are not cut off.
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Base of the exponential backoff between retries.
    pub const fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    /// Replace the default `User-Agent`.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Headers added to every request, after the SDK headers.
    pub fn default_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.default_headers.extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Accept certificates that do not chain to a trusted root.
    pub const fn accept_invalid_certs(mut self, enabled: bool) -> Self {
        self.accept_invalid_certs = enabled;
        self
    }

    /// Ignore system proxy settings.
    pub const fn no_proxy(mut self) -> Self {
        self.no_proxy = true;
        self
    }

    /// # Errors
    /// Returns `SaluteError::Generic` when reqwest cannot build the client.
    pub fn build(self) -> Result<HttpClient> {
        let mut builder = ReqwestClient::builder();

        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }

        if self.no_proxy {
            builder = builder.no_proxy();
        }

        if self.accept_invalid_certs {
            warn!("TLS certificate verification is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|err| SaluteError::generic(format!("Failed to build HTTP client: {err}")))?;

        let mut default_headers = sdk_headers();
        if let Some(agent) = self.user_agent {
            default_headers.push((reqwest::header::USER_AGENT.as_str().to_string(), agent));
        }
        default_headers.extend(self.default_headers);

        Ok(HttpClient { client, default_headers, base_backoff: self.base_backoff })
    }
}

/// Append percent-encoded query parameters to `base`.
///
/// Spaces become `%20`, never `+`. An existing query on `base` is kept.
///
/// # Errors
/// Returns a message when `base` is not an absolute URL.
pub fn build_url(base: &str, query: &[(String, String)]) -> std::result::Result<Url, String> {
    let mut url = Url::parse(base).map_err(|e| format!("Invalid URL {base:?}: {e}"))?;

    if !query.is_empty() {
        let encoded = encode_pairs(query);
        let combined = match url.query() {
            Some(existing) if !existing.is_empty() => format!("{existing}&{encoded}"),
            _ => encoded,
        };
        url.set_query(Some(&combined));
    }

    Ok(url)
}

fn encode_pairs<K: AsRef<str>, V: AsRef<str>>(pairs: &[(K, V)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k.as_ref()), urlencoding::encode(v.as_ref())))
        .collect::<Vec<_>>()
        .join("&")
}

async fn run_cancellable<F: std::future::Future>(
    cancel: Option<&CancellationToken>,
    future: F,
) -> Option<F::Output> {
    match cancel {
        Some(token) => tokio::select! {
            biased;
            () = token.cancelled() => None,
            output = future => Some(output),
        },
        None => Some(future.await),
    }
}

fn aborted(url: &Url) -> FetchResponse {
    debug!(%url, "HTTP request aborted");
    FetchResponse::failed(FetchError::aborted())
}

fn describe_error(err: reqwest::Error) -> AttemptFailure {
    if err.is_timeout() {
        AttemptFailure::Timeout
    } else {
        AttemptFailure::Transport(err.to_string())
    }
}

async fn read_response(response: Response) -> std::result::Result<FetchResponse, AttemptFailure> {
    let status = response.status();
    let status_text = status.canonical_reason().unwrap_or_default().to_string();

    if !status.is_success() {
        let body = response.text().await.ok().and_then(|text| parse_error_body(&text));
        return Ok(FetchResponse::http_failure(
            status.as_u16(),
            status_text.clone(),
            FetchError::http(status.as_u16(), &status_text, body),
        ));
    }

    let declared_empty = response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "0");
    if declared_empty {
        return Ok(FetchResponse::success(status.as_u16(), status_text, None));
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let data = if is_json(&content_type) {
        let value = response
            .json::<Value>()
            .await
            .map_err(|e| AttemptFailure::Transport(format!("Failed to parse JSON response: {e}")))?;
        ResponseData::Json(value)
    } else if content_type.starts_with("text/") {
        ResponseData::Text(response.text().await.map_err(describe_error)?)
    } else {
        ResponseData::Stream(Box::pin(
            response.bytes_stream().map_err(|e| SaluteError::generic(format!("Stream error: {e}"))),
        ))
    };

    Ok(FetchResponse::success(status.as_u16(), status_text, Some(data)))
}

fn is_json(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    essence == "application/json" || essence.ends_with("+json")
}

fn parse_error_body(text: &str) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }
    serde_json::from_str(text).ok()
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use futures::StreamExt;
    use serde_json::json;
    use wiremock::matchers::{body_string, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::http::FetchErrorKind;

    fn client_with_defaults() -> HttpClient {
        HttpClient::builder().base_backoff(Duration::from_millis(10)).no_proxy().build().unwrap()
    }

    fn unused_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener); // release the port so that requests fail with ECONNREFUSED
        format!("http://{addr}")
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let client = HttpClient::builder().build().unwrap();
        assert_eq!(client.backoff_delay(1), Duration::from_secs(1));
        assert_eq!(client.backoff_delay(2), Duration::from_secs(2));
        assert_eq!(client.backoff_delay(3), Duration::from_secs(4));
        assert_eq!(client.backoff_delay(4), Duration::from_secs(8));
        assert_eq!(client.backoff_delay(5), Duration::from_secs(10));
        assert_eq!(client.backoff_delay(40), Duration::from_secs(10));
    }

    #[test]
    fn build_url_encodes_query() {
        let query = vec![
            ("voice".to_string(), "May_24000".to_string()),
            ("note".to_string(), "a b&c".to_string()),
        ];
        let url = build_url("https://example.test/rest/v1/text:synthesize", &query).unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.test/rest/v1/text:synthesize?voice=May_24000&note=a%20b%26c"
        );

        let url = build_url("https://example.test/path?x=1", &query[1..]).unwrap();
        assert_eq!(url.as_str(), "https://example.test/path?x=1&note=a%20b%26c");

        let url = build_url("https://example.test/path", &[]).unwrap();
        assert_eq!(url.as_str(), "https://example.test/path");

        assert!(build_url("not a url", &[]).is_err());
    }

    #[test]
    fn json_content_types() {
        assert!(is_json("application/json"));
        assert!(is_json("application/json; charset=utf-8"));
        assert!(is_json("application/problem+json"));
        assert!(!is_json("audio/wav"));
        assert!(!is_json("text/plain"));
    }

    #[tokio::test]
    async fn classifies_json_text_and_binary_bodies() {
        let server = MockServer::start().await;
        Mock::given(path("/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;
        Mock::given(path("/text"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("hello", "text/plain"))
            .mount(&server)
            .await;
        Mock::given(path("/audio"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(vec![1u8, 2, 3, 4], "audio/wav"))
            .mount(&server)
            .await;

        let client = client_with_defaults();

        let response = client.fetch(FetchRequest::get(format!("{}/json", server.uri()))).await;
        assert!(response.ok);
        assert!(matches!(response.data, Some(ResponseData::Json(ref v)) if v["ok"] == true));

        let response = client.fetch(FetchRequest::get(format!("{}/text", server.uri()))).await;
        assert!(matches!(response.data, Some(ResponseData::Text(ref t)) if t == "hello"));

        let response = client.fetch(FetchRequest::get(format!("{}/audio", server.uri()))).await;
        let Some(ResponseData::Stream(mut stream)) = response.data else {
            panic!("expected a byte stream");
        };
        let mut audio = Vec::new();
        while let Some(chunk) = stream.next().await {
            audio.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(audio, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn zero_content_length_yields_no_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).insert_header("content-type", "audio/wav"))
            .mount(&server)
            .await;

        let response = client_with_defaults().fetch(FetchRequest::get(server.uri())).await;
        assert!(response.ok);
        assert!(response.data.is_none());
    }

    #[tokio::test]
    async fn does_not_retry_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "boom"})))
            .expect(1)
            .mount(&server)
            .await;

        let response =
            client_with_defaults().fetch(FetchRequest::get(server.uri()).retries(3)).await;

        assert!(!response.ok);
        assert_eq!(response.status, 500);
        assert_eq!(response.status_text, "Internal Server Error");
        let error = response.error.unwrap();
        assert_eq!(error.kind, FetchErrorKind::Http);
        assert_eq!(error.message, "HTTP 500: Internal Server Error");
        assert_eq!(error.body, Some(json!({"message": "boom"})));
    }

    #[tokio::test]
    async fn non_json_error_body_is_dropped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
            .mount(&server)
            .await;

        let response = client_with_defaults().fetch(FetchRequest::get(server.uri())).await;
        let error = response.error.unwrap();
        assert_eq!(error.message, "HTTP 502: Bad Gateway");
        assert_eq!(error.body, None);
    }

    #[tokio::test]
    async fn exhausted_retries_report_last_transport_error() {
        let response = client_with_defaults().fetch(FetchRequest::get(unused_url()).retries(2)).await;

        assert!(!response.ok);
        assert_eq!(response.status, 0);
        assert_eq!(response.status_text, "Request Failed");
        let error = response.error.unwrap();
        assert_eq!(error.kind, FetchErrorKind::Transport);
        assert!(!error.message.is_empty());
    }

    #[tokio::test]
    async fn retries_after_timeouts_until_success() {
        let server = MockServer::start().await;
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = attempts.clone();
        Mock::given(method("GET"))
            .respond_with(move |_req: &wiremock::Request| -> ResponseTemplate {
                let current = attempts_clone.fetch_add(1, Ordering::SeqCst);
                if current < 2 {
                    ResponseTemplate::new(200).set_delay(Duration::from_millis(500))
                } else {
                    ResponseTemplate::new(200).set_body_string("done")
                }
            })
            .expect(3)
            .mount(&server)
            .await;

        let request =
            FetchRequest::get(server.uri()).timeout(Duration::from_millis(100)).retries(2);
        let started = std::time::Instant::now();
        let response = client_with_defaults().fetch(request).await;

        assert!(response.ok, "{:?}", response.error);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        // Two timeouts plus two backoff delays (10ms, 20ms).
        assert!(started.elapsed() >= Duration::from_millis(230));
    }

    #[tokio::test]
    async fn timeout_after_last_attempt_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let request = FetchRequest::get(server.uri()).timeout(Duration::from_millis(50));
        let response = client_with_defaults().fetch(request).await;

        assert_eq!(response.status, 0);
        assert_eq!(response.error_kind(), Some(FetchErrorKind::Timeout));
    }

    #[tokio::test]
    async fn cancellation_aborts_without_retrying() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .expect(1)
            .mount(&server)
            .await;

        let token = CancellationToken::new();
        let request = FetchRequest::get(server.uri()).retries(3).cancel_token(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            token.cancel();
        });
        let response = client_with_defaults().fetch(request).await;
        canceller.await.unwrap();

        assert_eq!(response.status, 0);
        let error = response.error.unwrap();
        assert_eq!(error.kind, FetchErrorKind::Aborted);
        assert_eq!(error.message, "Request aborted");
    }

    #[tokio::test]
    async fn helpers_set_bodies_and_content_types() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/form"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string("scope=SALUTE_SPEECH_PERS&note=a%20b"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/json"))
            .and(header("content-type", "application/json"))
            .and(body_string(r#"{"a":1}"#))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/stream"))
            .and(header("content-type", "application/text"))
            .and(query_param("format", "opus"))
            .and(body_string("Привет"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_with_defaults();
        let form = [("scope", "SALUTE_SPEECH_PERS"), ("note", "a b")];
        assert!(client.fetch_form(FetchRequest::post(format!("{}/form", server.uri())), &form).await.ok);
        assert!(
            client
                .fetch_json(FetchRequest::post(format!("{}/json", server.uri())), &json!({"a": 1}))
                .await
                .ok
        );
        let request = FetchRequest::post(format!("{}/stream", server.uri())).query("format", "opus");
        assert!(client.fetch_stream(request, "Привет").await.ok);
    }

    #[tokio::test]
    async fn sends_sdk_headers_and_lets_requests_override() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("x-sdk-name", "salutespeech-rs"))
            .and(header("x-runtime", "custom"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let response = client_with_defaults()
            .fetch(FetchRequest::get(server.uri()).header("X-Runtime", "custom"))
            .await;
        assert!(response.ok);
    }
}
