//! HTTP transport
//!
//! A thin layer over reqwest with per-attempt timeouts, exponential backoff on
//! transport failures, cancellation, and content-type based body handling.

pub mod client;
pub mod headers;
pub mod types;

pub use client::{build_url, HttpClient, HttpClientBuilder};
pub use headers::sdk_headers;
pub use types::{
    ByteStream, FetchError, FetchErrorKind, FetchRequest, FetchResponse, ResponseData,
    REQUEST_FAILED,
};
