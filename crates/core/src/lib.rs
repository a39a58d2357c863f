//! # SaluteSpeech Core
//!
//! Transport-agnostic pieces of the client.
//!
//! This crate contains:
//! - Port interfaces ([`TokenExchanger`], [`AccessTokenProvider`])
//! - The [`TokenManager`], which caches tokens per credential triple and
//!   collapses concurrent refreshes into a single exchange
//!
//! ## Architecture Principles
//! - Only depends on `salutespeech-domain`
//! - No HTTP code; the OAuth call is reached through [`TokenExchanger`]

pub mod auth;
pub mod ports;

pub use auth::TokenManager;
pub use ports::{AccessTokenProvider, TokenExchanger};
