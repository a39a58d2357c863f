//! Speech synthesis

pub mod client;

pub use client::{RequestOptions, TextToSpeechClient};
