//! OAuth token exchange against the SaluteSpeech identity endpoint

pub mod oauth;

pub use oauth::SaluteOAuthClient;
