//! Text-to-speech request types

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::MAX_TEXT_LENGTH;
use crate::errors::{Result, SaluteError};
use crate::impl_wire_str_conversions;

/// Output audio encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// WAV container, 16-bit PCM.
    #[default]
    Wav16,
    /// Raw 16-bit PCM.
    Pcm16,
    /// Opus in an OGG container.
    Opus,
    /// A-law, 8 kHz.
    Alaw,
    /// G.729, 8 kHz.
    G729,
}

impl_wire_str_conversions!(AudioFormat {
    Wav16 => "wav16",
    Pcm16 => "pcm16",
    Opus => "opus",
    Alaw => "alaw",
    G729 => "g729",
});

/// A synthesis voice: speaker name plus sample rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Voice {
    /// Speaker name, e.g. `May`.
    pub name: &'static str,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl Voice {
    /// May, 24 kHz.
    pub const MAY_24000: Self = Self { name: "May", sample_rate: 24_000 };
    /// May, 8 kHz.
    pub const MAY_8000: Self = Self { name: "May", sample_rate: 8_000 };
    /// Nec, 24 kHz.
    pub const NEC_24000: Self = Self { name: "Nec", sample_rate: 24_000 };
    /// Bys, 24 kHz.
    pub const BYS_24000: Self = Self { name: "Bys", sample_rate: 24_000 };
    /// Tur, 24 kHz.
    pub const TUR_24000: Self = Self { name: "Tur", sample_rate: 24_000 };
    /// Ost, 24 kHz.
    pub const OST_24000: Self = Self { name: "Ost", sample_rate: 24_000 };
    /// Pon, 24 kHz.
    pub const PON_24000: Self = Self { name: "Pon", sample_rate: 24_000 };
    /// Kin, 24 kHz.
    pub const KIN_24000: Self = Self { name: "Kin", sample_rate: 24_000 };

    /// Identifier sent as the `voice` query parameter, e.g. `May_24000`.
    #[must_use]
    pub fn id(&self) -> String {
        format!("{}_{}", self.name, self.sample_rate)
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.name, self.sample_rate)
    }
}

impl From<Voice> for String {
    fn from(voice: Voice) -> Self {
        voice.id()
    }
}

/// A single synthesis request.
///
/// `text` may contain SSML. Optional fields are only sent when set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesizeRequest {
    /// Plain text or SSML to synthesize.
    pub text: String,
    /// Output audio format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<AudioFormat>,
    /// Voice identifier, e.g. `May_24000`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    /// Ask the server to regenerate a cached result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rebuild_cache: Option<bool>,
    /// Ask the server to skip its cache.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bypass_cache: Option<bool>,
    /// Value for the `X-Request-ID` header; a UUID v4 is generated otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl SynthesizeRequest {
    /// Request for `text` with server defaults elsewhere.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Self::default() }
    }

    /// Set the output format.
    #[must_use]
    pub const fn format(mut self, format: AudioFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Set the voice; accepts a [`Voice`] or a raw identifier.
    #[must_use]
    pub fn voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    /// Set the `rebuild_cache` flag.
    #[must_use]
    pub const fn rebuild_cache(mut self, rebuild: bool) -> Self {
        self.rebuild_cache = Some(rebuild);
        self
    }

    /// Set the `bypass_cache` flag.
    #[must_use]
    pub const fn bypass_cache(mut self, bypass: bool) -> Self {
        self.bypass_cache = Some(bypass);
        self
    }

    /// Set the `X-Request-ID` header value.
    #[must_use]
    pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Number of characters in `text`, as counted against the limit.
    #[must_use]
    pub fn text_length(&self) -> usize {
        self.text.chars().count()
    }

    /// Reject texts longer than [`MAX_TEXT_LENGTH`] characters.
    ///
    /// # Errors
    /// Returns `SaluteError::Generic` when the text is too long.
    pub fn validate(&self) -> Result<()> {
        if self.text_length() > MAX_TEXT_LENGTH {
            return Err(SaluteError::generic(format!(
                "Text exceeds maximum length of {MAX_TEXT_LENGTH} characters"
            )));
        }
        Ok(())
    }

    /// Query parameters for the synthesis endpoint, in a stable order.
    #[must_use]
    pub fn query_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();

        if let Some(format) = self.format {
            params.push(("format".to_string(), format.to_string()));
        }
        if let Some(voice) = self.voice.as_deref().filter(|v| !v.is_empty()) {
            params.push(("voice".to_string(), voice.to_string()));
        }
        if let Some(rebuild) = self.rebuild_cache {
            params.push(("rebuild_cache".to_string(), rebuild.to_string()));
        }
        if let Some(bypass) = self.bypass_cache {
            params.push(("bypass_cache".to_string(), bypass.to_string()));
        }

        params
    }
}
