//! Text-to-speech synthesis client
//!
//! Sends text (plain or SSML) to the synthesis endpoint and hands back the
//! audio as a live byte stream. HTTP failures are mapped onto the
//! `SaluteError` kinds callers dispatch on.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::stream;
use reqwest::header::AUTHORIZATION;
use salutespeech_core::AccessTokenProvider;
use salutespeech_domain::constants::{DEFAULT_MAX_RETRIES, DEFAULT_SYNTHESIS_URL, DEFAULT_TIMEOUT_MS};
use salutespeech_domain::{ErrorDetails, Result, SaluteError, SynthesizeRequest};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::http::{ByteStream, FetchErrorKind, FetchRequest, FetchResponse, HttpClient, ResponseData};

const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Per-call overrides for [`TextToSpeechClient::synthesize_with_options`].
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Per-attempt timeout; the client default when `None`.
    pub timeout: Option<Duration>,
    /// Transport retries; the client default when `None`.
    pub max_retries: Option<u32>,
    /// Extra query parameters, appended after the request's own.
    pub query_params: Vec<(String, String)>,
    /// Extra headers; these override client and request headers.
    pub headers: Vec<(String, String)>,
    /// Aborts the request when cancelled.
    pub cancel: Option<CancellationToken>,
}

impl RequestOptions {
    /// Override the client timeout for this call.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Override the client retry count for this call.
    #[must_use]
    pub const fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Extra query parameter for this call.
    #[must_use]
    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((key.into(), value.into()));
        self
    }

    /// Extra header for this call.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Abort the call when `token` is cancelled.
    #[must_use]
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Client for the synthesis endpoint.
#[derive(Clone)]
pub struct TextToSpeechClient {
    http: HttpClient,
    url: String,
    token_provider: Option<Arc<dyn AccessTokenProvider>>,
    headers: Vec<(String, String)>,
    timeout: Duration,
    max_retries: u32,
}

impl std::fmt::Debug for TextToSpeechClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextToSpeechClient")
            .field("url", &self.url)
            .field("has_token_provider", &self.token_provider.is_some())
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

impl TextToSpeechClient {
    /// Client with default endpoint and no token provider.
    #[must_use]
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            url: DEFAULT_SYNTHESIS_URL.to_string(),
            token_provider: None,
            headers: Vec::new(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Override the synthesis endpoint.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Source of Bearer tokens.
    #[must_use]
    pub fn with_token_provider(mut self, provider: Arc<dyn AccessTokenProvider>) -> Self {
        self.token_provider = Some(provider);
        self
    }

    /// Headers sent with every synthesis request.
    #[must_use]
    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers.extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Default per-attempt timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Default retries after transport failures.
    #[must_use]
    pub const fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Synthesize `request` and return the audio stream.
    ///
    /// # Errors
    /// - `Generic` when the text exceeds 4000 characters (no request is made)
    /// - `Auth` when no token provider is attached, the token cannot be
    ///   obtained, or the endpoint answers 401/403
    /// - `RateLimit` on 429
    /// - `Timeout` when every attempt timed out
    /// - `Generic` for any other failure, including an empty body
    pub async fn synthesize(&self, request: &SynthesizeRequest) -> Result<ByteStream> {
        self.synthesize_with_options(request, RequestOptions::default()).await
    }

    /// [`Self::synthesize`] with per-call overrides.
    ///
    /// # Errors
    /// See [`Self::synthesize`]; a cancelled call fails with
    /// `Generic("Request aborted")`.
    pub async fn synthesize_with_options(
        &self,
        request: &SynthesizeRequest,
        options: RequestOptions,
    ) -> Result<ByteStream> {
        request.validate()?;

        let provider = self
            .token_provider
            .as_ref()
            .ok_or_else(|| {
                SaluteError::auth("Client ID and Client Secret are required for authentication")
            })?;
        let token = provider.access_token().await?;

        let request_id =
            request.request_id.clone().unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let text_length = request.text_length();
        debug!(%request_id, text_length, format = ?request.format, voice = ?request.voice, "synthesizing speech");

        let mut fetch = FetchRequest::post(&self.url)
            .query_params(request.query_params())
            .query_params(options.query_params)
            .headers(self.headers.iter().cloned())
            .header(AUTHORIZATION.as_str(), format!("Bearer {token}"))
            .header(REQUEST_ID_HEADER, request_id.clone())
            .headers(options.headers)
            .timeout(options.timeout.unwrap_or(self.timeout))
            .retries(options.max_retries.unwrap_or(self.max_retries));
        if let Some(cancel) = options.cancel {
            fetch = fetch.cancel_token(cancel);
        }

        let response = self.http.fetch_stream(fetch, request.text.clone()).await;
        let status = response.status;

        match into_audio_stream(response) {
            Ok(stream) => {
                info!(%request_id, text_length, status, "speech synthesized");
                Ok(stream)
            }
            Err(e) => {
                warn!(%request_id, status, kind = ?e.kind(), error = %e, "speech synthesis failed");
                Err(e)
            }
        }
    }
}

fn into_audio_stream(response: FetchResponse) -> Result<ByteStream> {
    if !response.ok {
        return Err(map_failure(response));
    }

    let status = response.status;
    match response.data {
        Some(ResponseData::Stream(stream)) => Ok(stream),
        Some(ResponseData::Text(text)) => Ok(single_chunk(Bytes::from(text))),
        Some(ResponseData::Json(value)) => Ok(single_chunk(Bytes::from(value.to_string()))),
        None => Err(SaluteError::generic("Response body is empty").with_status(status)),
    }
}

fn single_chunk(bytes: Bytes) -> ByteStream {
    Box::pin(stream::once(async move { Ok(bytes) }))
}

/// Map a failed fetch onto the error kind callers dispatch on.
fn map_failure(response: FetchResponse) -> SaluteError {
    let status = response.status;
    let (kind, message, body) = match response.error {
        Some(error) => (Some(error.kind), Some(error.message), error.body),
        None => (None, None, None),
    };
    let status_code = (status != 0).then_some(status);

    let (constructor, message): (fn(ErrorDetails) -> SaluteError, String) = match (status, kind) {
        (401 | 403, _) => (SaluteError::Auth, "Authentication failed".to_string()),
        (429, _) => (SaluteError::RateLimit, "Rate limit exceeded".to_string()),
        (0, Some(FetchErrorKind::Timeout)) => (SaluteError::Timeout, "Request timed out".to_string()),
        (0, Some(FetchErrorKind::Aborted)) => (SaluteError::Generic, "Request aborted".to_string()),
        _ => (SaluteError::Generic, message.unwrap_or_else(|| "Unknown error".to_string())),
    };

    constructor(ErrorDetails::from_parts(Some(message), status_code, body))
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use futures::StreamExt;
    use salutespeech_domain::{AudioFormat, ErrorKind, Voice};
    use serde_json::json;
    use wiremock::matchers::{body_string, header, header_exists, method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::http::FetchError;

    struct StaticToken(Result<String>);

    #[async_trait]
    impl AccessTokenProvider for StaticToken {
        async fn access_token(&self) -> Result<String> {
            self.0.clone()
        }
    }

    fn tts_client(server: &MockServer) -> TextToSpeechClient {
        let http = HttpClient::builder()
            .base_backoff(Duration::from_millis(10))
            .no_proxy()
            .build()
            .unwrap();
        TextToSpeechClient::new(http)
            .with_url(format!("{}/rest/v1/text:synthesize", server.uri()))
            .with_token_provider(Arc::new(StaticToken(Ok("test-token".to_string()))))
    }

    async fn collect(mut stream: ByteStream) -> Vec<u8> {
        let mut audio = Vec::new();
        while let Some(chunk) = stream.next().await {
            audio.extend_from_slice(&chunk.unwrap());
        }
        audio
    }

    #[tokio::test]
    async fn streams_audio_with_expected_request_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer test-token"))
            .and(header("content-type", "application/text"))
            .and(header("x-request-id", "req-1"))
            .and(header("x-custom", "yes"))
            .and(query_param("format", "opus"))
            .and(query_param("voice", "May_24000"))
            .and(query_param("bypass_cache", "true"))
            .and(body_string("<speak>Привет</speak>"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(vec![7u8; 64], "audio/ogg"))
            .expect(1)
            .mount(&server)
            .await;

        let request = SynthesizeRequest::new("<speak>Привет</speak>")
            .format(AudioFormat::Opus)
            .voice(Voice::MAY_24000)
            .bypass_cache(true)
            .request_id("req-1");

        let stream =
            tts_client(&server).with_headers([("X-Custom", "yes")]).synthesize(&request).await.unwrap();
        assert_eq!(collect(stream).await, vec![7u8; 64]);
    }

    #[tokio::test]
    async fn generates_request_id_when_absent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header_exists("x-request-id"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(vec![1u8], "audio/wav"))
            .expect(1)
            .mount(&server)
            .await;

        tts_client(&server).synthesize(&SynthesizeRequest::new("hi")).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let id = requests[0].headers.get("x-request-id").unwrap().to_str().unwrap();
        assert!(uuid::Uuid::parse_str(id).is_ok());
    }

    #[tokio::test]
    async fn overlong_text_fails_before_any_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let request = SynthesizeRequest::new("a".repeat(4001));
        let Err(err) = tts_client(&server).synthesize(&request).await else {
            panic!("expected validation failure");
        };

        assert_eq!(err.kind(), ErrorKind::Generic);
        assert_eq!(err.message(), "Text exceeds maximum length of 4000 characters");
    }

    #[tokio::test]
    async fn missing_token_provider_is_an_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let http = HttpClient::builder().no_proxy().build().unwrap();
        let client = TextToSpeechClient::new(http).with_url(server.uri());

        let Err(err) = client.synthesize(&SynthesizeRequest::new("hi")).await else {
            panic!("expected auth failure");
        };
        assert_eq!(err.kind(), ErrorKind::Auth);
        assert_eq!(err.message(), "Client ID and Client Secret are required for authentication");
    }

    #[tokio::test]
    async fn token_failures_propagate_unchanged() {
        let server = MockServer::start().await;
        let failure = SaluteError::auth("OAuth authentication failed").with_status(401);

        let client = tts_client(&server)
            .with_token_provider(Arc::new(StaticToken(Err(failure.clone()))));

        let Err(err) = client.synthesize(&SynthesizeRequest::new("hi")).await else {
            panic!("expected token failure");
        };
        assert_eq!(err, failure);
    }

    #[tokio::test]
    async fn maps_http_statuses_to_error_kinds() {
        let cases = [
            (401, ErrorKind::Auth, "Authentication failed"),
            (403, ErrorKind::Auth, "Authentication failed"),
            (429, ErrorKind::RateLimit, "Rate limit exceeded"),
            (400, ErrorKind::Generic, "HTTP 400: Bad Request"),
        ];

        for (status, kind, message) in cases {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(
                    ResponseTemplate::new(status).set_body_json(json!({"message": "invalid voice"})),
                )
                .expect(1)
                .mount(&server)
                .await;

            let Err(err) = tts_client(&server).synthesize(&SynthesizeRequest::new("hi")).await else {
                panic!("expected failure for {status}");
            };

            assert_eq!(err.kind(), kind, "status {status}");
            assert_eq!(err.message(), message, "status {status}");
            assert_eq!(err.status_code(), Some(status));
            assert_eq!(err.body(), Some(&json!({"message": "invalid voice"})));
        }
    }

    #[tokio::test]
    async fn html_gateway_page_is_not_exposed_as_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("<html>unavailable</html>"))
            .mount(&server)
            .await;

        let Err(err) = tts_client(&server).synthesize(&SynthesizeRequest::new("hi")).await else {
            panic!("expected failure");
        };
        assert_eq!(err.kind(), ErrorKind::Generic);
        assert_eq!(err.message(), "HTTP 503: Service Unavailable");
        assert_eq!(err.body(), None);
    }

    #[tokio::test]
    async fn empty_body_is_a_generic_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let Err(err) = tts_client(&server).synthesize(&SynthesizeRequest::new("hi")).await else {
            panic!("expected failure");
        };
        assert_eq!(err.kind(), ErrorKind::Generic);
        assert_eq!(err.message(), "Response body is empty");
        assert_eq!(err.status_code(), Some(200));
    }

    #[tokio::test]
    async fn timeouts_become_timeout_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .expect(2)
            .mount(&server)
            .await;

        let options = RequestOptions::default().timeout(Duration::from_millis(50)).max_retries(1);
        let Err(err) = tts_client(&server)
            .synthesize_with_options(&SynthesizeRequest::new("hi"), options)
            .await
        else {
            panic!("expected timeout");
        };

        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(err.message(), "Request timed out");
        assert_eq!(err.status_code(), None);
    }

    #[tokio::test]
    async fn options_add_query_params_and_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(query_param("format", "wav16"))
            .and(query_param("trace", "1"))
            .and(header("x-trace", "abc"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0u8; 4], "audio/wav"))
            .expect(1)
            .mount(&server)
            .await;

        let options = RequestOptions::default().query_param("trace", "1").header("X-Trace", "abc");
        let request = SynthesizeRequest::new("hi").format(AudioFormat::Wav16);
        let stream =
            tts_client(&server).synthesize_with_options(&request, options).await.unwrap();
        assert_eq!(collect(stream).await.len(), 4);
    }

    #[tokio::test]
    async fn cancelled_call_is_aborted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let token = CancellationToken::new();
        token.cancel();
        let options = RequestOptions::default().cancel_token(token);

        let Err(err) = tts_client(&server)
            .synthesize_with_options(&SynthesizeRequest::new("hi"), options)
            .await
        else {
            panic!("expected abort");
        };
        assert_eq!(err.kind(), ErrorKind::Generic);
        assert_eq!(err.message(), "Request aborted");
    }

    #[test]
    fn transport_failure_keeps_its_message() {
        let response = FetchResponse::failed(FetchError::transport("connection refused"));
        let err = map_failure(response);
        assert_eq!(err.kind(), ErrorKind::Generic);
        assert_eq!(err.message(), "connection refused");
        assert_eq!(err.status_code(), None);
    }
}
