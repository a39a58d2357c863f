//! # SaluteSpeech Infrastructure
//!
//! I/O side of the SaluteSpeech client.
//!
//! This crate contains:
//! - The HTTP transport (reqwest with timeouts, retries and cancellation)
//! - The OAuth exchanger implementing [`salutespeech_core::TokenExchanger`]
//! - The synthesis client
//! - The configuration loader
//! - [`SaluteSpeechClient`], which wires everything together
//!
//! ## Architecture
//! - Implements traits defined in `salutespeech-core`
//! - Contains all code that talks to the network or the filesystem

pub mod auth;
pub mod client;
pub mod config;
pub mod http;
pub mod tts;

// Re-export commonly used items
pub use auth::SaluteOAuthClient;
pub use client::SaluteSpeechClient;
pub use http::{ByteStream, FetchRequest, FetchResponse, HttpClient, HttpClientBuilder};
pub use tts::{RequestOptions, TextToSpeechClient};
