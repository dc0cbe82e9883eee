//! JSON body decoding.

use millrace_core::{DecodeError, DecodeResult};

/// Decode a complete JSON body. An empty body is an absent value, not an
/// error.
pub fn decode_json(body: &[u8]) -> DecodeResult<Option<serde_json::Value>> {
    let text = std::str::from_utf8(body)
        .map_err(|_| DecodeError::Malformed("request body is not valid UTF-8".to_string()))?;
    if text.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(text)
        .map(Some)
        .map_err(|err| DecodeError::Malformed(err.to_string()))
}
