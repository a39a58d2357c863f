//! Default SDK headers and header merging

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use salutespeech_domain::constants::{SDK_NAME, SDK_VERSION};

/// Headers identifying this SDK, sent with every request.
#[must_use]
pub fn sdk_headers() -> Vec<(String, String)> {
    vec![
        (USER_AGENT.as_str().to_string(), format!("{SDK_NAME}/{SDK_VERSION}")),
        ("X-SDK-Name".to_string(), SDK_NAME.to_string()),
        ("X-SDK-Version".to_string(), SDK_VERSION.to_string()),
        ("X-Runtime".to_string(), "rust".to_string()),
    ]
}

/// Merge header lists into a [`HeaderMap`]; later lists override earlier ones.
///
/// # Errors
/// Returns a message naming the first invalid header name or value.
pub fn merge_headers(layers: &[&[(String, String)]]) -> Result<HeaderMap, String> {
    let mut map = HeaderMap::new();

    for layer in layers {
        for (name, value) in *layer {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| format!("Invalid header name {name:?}: {e}"))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| format!("Invalid value for header {name}: {e}"))?;
            map.insert(name, value);
        }
    }

    Ok(map)
}
