//! Multipart body decoding.
//!
//! Operates on the fully accumulated body: the payload is split on the
//! boundary marker, so transport chunk sizes, including splits that land
//! inside the marker itself, never change the result.

use std::collections::HashMap;

use bytes::Bytes;
use millrace_core::{DecodeError, DecodeResult, PartValue};

/// Decode a `multipart/form-data` body against its boundary token.
///
/// Per part: the field name comes from the `name` parameter of the
/// `Content-Disposition` header, and parts without a usable disposition
/// are skipped. A part declaring any `Content-Type` is kept as raw bytes;
/// everything else is decoded as UTF-8 text. Trailing boundary artifacts
/// (`-` runs, then CR/LF runs) are stripped from each part's content.
pub fn decode_multipart(
    body: &[u8],
    boundary: &[u8],
) -> DecodeResult<HashMap<String, PartValue>> {
    if boundary.is_empty() {
        return Err(DecodeError::Malformed("empty multipart boundary".to_string()));
    }
    let marker = [b"--", boundary].concat();

    let mut parts = HashMap::new();
    for part in split_on(body, &marker) {
        if part.is_empty() || part.trim_ascii() == b"--" {
            continue;
        }
        let (header_block, content) = match split_once_on(part, b"\r\n\r\n") {
            Some(split) => split,
            None => {
                return Err(DecodeError::Malformed(
                    "multipart part without a header/content break".to_string(),
                ));
            }
        };

        let headers: Vec<&[u8]> = split_on(header_block, b"\r\n");
        let Some(name) = field_name(&headers) else {
            continue;
        };

        let content = strip_artifacts(content);
        if declares_content_type(&headers) {
            parts.insert(name, PartValue::Binary(Bytes::copy_from_slice(content)));
        } else {
            let text = std::str::from_utf8(content).map_err(|_| {
                DecodeError::Malformed(format!("multipart field {name} is not valid UTF-8"))
            })?;
            parts.insert(name, PartValue::Text(text.to_string()));
        }
    }
    Ok(parts)
}

/// Pull the `name` parameter out of the part's `Content-Disposition`
/// header. `None` when the header or parameter is missing or empty.
fn field_name(headers: &[&[u8]]) -> Option<String> {
    for line in headers {
        let Ok(line) = std::str::from_utf8(line) else {
            continue;
        };
        let lower = line.to_ascii_lowercase();
        if !lower.starts_with("content-disposition:") {
            continue;
        }
        for param in line.split(';').skip(1) {
            if let Some((key, raw)) = param.split_once('=') {
                if key.trim().eq_ignore_ascii_case("name") {
                    let name = raw.trim().trim_matches('"');
                    if !name.is_empty() {
                        return Some(name.to_string());
                    }
                }
            }
        }
    }
    None
}

fn declares_content_type(headers: &[&[u8]]) -> bool {
    headers.iter().any(|line| {
        String::from_utf8_lossy(line)
            .to_ascii_lowercase()
            .contains("content-type")
    })
}

/// Trailing `-` runs first, then trailing CR/LF runs.
fn strip_artifacts(mut content: &[u8]) -> &[u8] {
    while let [head @ .., b'-'] = content {
        content = head;
    }
    while let [head @ .., b'\r' | b'\n'] = content {
        content = head;
    }
    content
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn split_on<'a>(mut haystack: &'a [u8], needle: &[u8]) -> Vec<&'a [u8]> {
    let mut pieces = Vec::new();
    while let Some(at) = find(haystack, needle) {
        pieces.push(&haystack[..at]);
        haystack = &haystack[at + needle.len()..];
    }
    pieces.push(haystack);
    pieces
}

fn split_once_on<'a>(haystack: &'a [u8], needle: &[u8]) -> Option<(&'a [u8], &'a [u8])> {
    let at = find(haystack, needle)?;
    Some((&haystack[..at], &haystack[at + needle.len()..]))
}
