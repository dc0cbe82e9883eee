//! Error taxonomy for the request pipeline.

use thiserror::Error;

/// Result type alias for body decoding.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Why a request body could not be decoded.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The accumulated body crossed the configured ceiling. Reported the
    /// moment the limit is crossed; remaining chunks are not drained.
    #[error("request body too large: {got} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge { limit: usize, got: usize },

    /// The body arrived whole but could not be parsed as its declared
    /// content type.
    #[error("malformed request body: {0}")]
    Malformed(String),

    /// The client disconnected before the body completed.
    #[error("client disconnected mid-body")]
    ClientGone,
}

/// Render the canonical JSON error document sent in error responses.
pub fn error_body(error: &str, message: &str) -> String {
    serde_json::json!({
        "error": error,
        "message": message,
    })
    .to_string()
}
