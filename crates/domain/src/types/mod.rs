//! Domain types and models

pub mod auth;
pub mod tts;

pub use auth::{Credentials, OAuthResponse, OAuthScope, TokenData};
pub use tts::{AudioFormat, SynthesizeRequest, Voice};
