//! Configuration loading
//!
//! Loads [`SaluteConfig`](salutespeech_domain::SaluteConfig) from environment
//! variables and TOML/JSON files.

pub mod loader;

pub use loader::{apply_overrides, load, load_from_env, load_from_file, probe_config_paths};
