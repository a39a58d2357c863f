//! # SaluteSpeech Domain
//!
//! Domain types for the SaluteSpeech text-to-speech client.
//!
//! This crate contains:
//! - Credential, token and synthesis request types
//! - The error taxonomy and `Result` alias
//! - Client configuration structures
//! - Endpoint constants and limits
//!
//! ## Architecture
//! - No dependencies on other SaluteSpeech crates
//! - No I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
