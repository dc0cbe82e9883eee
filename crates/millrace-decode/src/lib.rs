//! Request body decoding.
//!
//! Bodies arrive as transport chunks; every decoder first accumulates them
//! through [`read_body`] and only then parses, so parse results never
//! depend on where the transport happened to split the bytes. A single
//! size ceiling guards the accumulation: the moment the running total
//! crosses it, decoding fails with [`DecodeError::PayloadTooLarge`] without
//! draining the rest of the body.
//!
//! [`BodyKind`] classifies the request's `content-type` header; callers
//! decode known kinds via [`decode_body`] and leave unknown ones alone.

mod form;
mod json;
mod multipart;

pub use form::decode_urlencoded;
pub use json::decode_json;
pub use multipart::decode_multipart;

use bytes::{Bytes, BytesMut};
use millrace_core::{DecodeError, DecodeResult, DecodedBody, FrameReceiver, InboundEvent};
use tracing::warn;

/// What the request's `content-type` says the body is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyKind {
    Json,
    UrlEncoded,
    Multipart { boundary: Vec<u8> },
    /// Anything else, including multipart without a usable boundary.
    Unknown,
}

impl BodyKind {
    /// Classify a `content-type` header value. The media type is compared
    /// case-insensitively with its parameters ignored; multipart reads its
    /// `boundary` parameter, quoted or bare.
    pub fn from_content_type(value: &str) -> Self {
        let media_type = value
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        match media_type.as_str() {
            "application/json" => Self::Json,
            "application/x-www-form-urlencoded" => Self::UrlEncoded,
            "multipart/form-data" => match boundary_param(value) {
                Some(boundary) => Self::Multipart { boundary },
                None => Self::Unknown,
            },
            _ => Self::Unknown,
        }
    }
}

fn boundary_param(value: &str) -> Option<Vec<u8>> {
    for param in value.split(';').skip(1) {
        if let Some((key, raw)) = param.split_once('=') {
            if key.trim().eq_ignore_ascii_case("boundary") {
                let token = raw.trim().trim_matches('"');
                if !token.is_empty() {
                    return Some(token.as_bytes().to_vec());
                }
            }
        }
    }
    None
}

/// Accumulate body chunks until the transport signals the last one.
///
/// Fails fast on the size ceiling and on a client that disconnects before
/// finishing. Lifecycle events arriving mid-body are logged and skipped.
pub async fn read_body(rx: &mut dyn FrameReceiver, limit: usize) -> DecodeResult<Bytes> {
    let mut body = BytesMut::new();
    loop {
        let event = rx.receive().await.map_err(|_| DecodeError::ClientGone)?;
        match event {
            InboundEvent::Request { body: chunk, more_body } => {
                body.extend_from_slice(&chunk);
                if body.len() > limit {
                    return Err(DecodeError::PayloadTooLarge {
                        limit,
                        got: body.len(),
                    });
                }
                if !more_body {
                    return Ok(body.freeze());
                }
            }
            InboundEvent::Disconnect => return Err(DecodeError::ClientGone),
            other => {
                warn!(event = ?other, "ignoring lifecycle event inside a request body");
            }
        }
    }
}

/// Read and decode a body of a known kind.
///
/// `Ok(None)` means there was nothing to decode: an empty JSON body, or an
/// [`BodyKind::Unknown`] kind the caller chose to pass through anyway.
pub async fn decode_body(
    rx: &mut dyn FrameReceiver,
    kind: &BodyKind,
    limit: usize,
) -> DecodeResult<Option<DecodedBody>> {
    let body = read_body(rx, limit).await?;
    match kind {
        BodyKind::Json => Ok(decode_json(&body)?.map(DecodedBody::Json)),
        BodyKind::UrlEncoded => Ok(Some(DecodedBody::Form(decode_urlencoded(&body)))),
        BodyKind::Multipart { boundary } => Ok(Some(DecodedBody::Multipart(decode_multipart(
            &body, boundary,
        )?))),
        BodyKind::Unknown => Ok(None),
    }
}
