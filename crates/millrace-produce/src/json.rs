//! Built-in JSON producer.

use millrace_core::RequestState;

use crate::stream::{self, ChunkStream};

/// Serialize a `serde_json::Value` as one compact chunk.
pub fn produce_json(value: &serde_json::Value, _state: &RequestState) -> ChunkStream {
    match serde_json::to_string(value) {
        Ok(text) => stream::text(text),
        Err(err) => stream::failure(err),
    }
}
