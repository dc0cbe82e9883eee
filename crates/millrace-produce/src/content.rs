//! Static content values with extension-based content-type guessing.

use std::fmt;
use std::path::Path;

use bytes::Bytes;
use millrace_core::{EscapeResponse, HeaderList, RequestState, StartFrame};

use crate::stream::{self, ChunkStream};

/// A named blob served as-is: the response content type is guessed from
/// the name's extension.
#[derive(Debug, Clone)]
pub struct StaticContent {
    name: String,
    body: Bytes,
}

impl StaticContent {
    pub fn new(name: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
        }
    }

    /// Load a file from disk, naming the content after the file.
    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let body = std::fs::read(path)?;
        Ok(Self::new(name, body))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

impl fmt::Display for StaticContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Produce a [`StaticContent`] value as an escape response carrying its
/// guessed content type. Registered under `*/*` by
/// [`Registry::with_defaults`](crate::Registry::with_defaults).
pub fn produce_static(content: &StaticContent, _state: &RequestState) -> ChunkStream {
    let content_type = content_type_for(&content.name);
    let escape = EscapeResponse::new(
        StartFrame::new(200, HeaderList::from_pairs([("content-type", content_type)])),
        content.body.clone(),
    );
    stream::escape(escape)
}

/// Guess a content type from a file name's extension. Textual types get a
/// UTF-8 charset parameter; unknown extensions fall back to octet-stream.
pub fn content_type_for(name: &str) -> String {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    let mime = match ext.as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "xml" => "application/xml",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        "pdf" => "application/pdf",
        "ttf" => "font/ttf",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "wasm" => "application/wasm",
        _ => "application/octet-stream",
    };
    if is_textual(mime) {
        format!("{mime}; charset=UTF-8")
    } else {
        mime.to_string()
    }
}

fn is_textual(mime: &str) -> bool {
    mime.starts_with("text/")
        || matches!(
            mime,
            "application/json" | "application/javascript" | "application/xml" | "image/svg+xml"
        )
}
