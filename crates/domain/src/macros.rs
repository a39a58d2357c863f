//! Macro for implementing Display and FromStr for wire-value enums
//!
//! Several API parameters (audio formats, for example) are closed sets of
//! lowercase strings. This macro derives both directions of the conversion
//! from a single table.
//!
//! # Example
//!
//! ```rust
//! use salutespeech_domain::impl_wire_str_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Codec {
//!     Opus,
//!     Pcm,
//! }
//!
//! impl_wire_str_conversions!(Codec {
//!     Opus => "opus",
//!     Pcm => "pcm",
//! });
//!
//! assert_eq!(Codec::Opus.to_string(), "opus");
//! assert_eq!("PCM".parse::<Codec>().unwrap(), Codec::Pcm);
//! ```

/// Implements Display and FromStr traits for wire-value enums
///
/// This macro generates:
/// - Display trait: writes the wire value
/// - FromStr trait: parses case-insensitive strings to enum variants
///
/// Wire values in the table must be lowercase.
#[macro_export]
macro_rules! impl_wire_str_conversions {
    ($enum_name:ident { $($variant:ident => $str:literal),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => ::std::result::Result::Ok(Self::$variant),)+
                    _ => ::std::result::Result::Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
