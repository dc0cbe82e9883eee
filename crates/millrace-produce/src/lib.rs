//! Content production: turning resolved application values into response
//! chunk streams.
//!
//! A [`Registry`] maps (mime type, exact runtime type) pairs to
//! [`Producer`]s. Dispatch walks the request's accept list in order and
//! hands the value to the first producer registered for that mime and the
//! value's concrete type; there is no subtype matching. When nothing
//! matches, the value's own textual representation becomes a single
//! fallback chunk.
//!
//! # Output Model
//!
//! Producers return a [`ChunkStream`]: a lazy stream whose items are
//! ordinary data chunks, inline [`EscapeResponse`]s, or a terminal
//! [`Interrupt`] (an escape or a failure). Nothing is buffered ahead of
//! the consumer; the response assembler pulls chunks one at a time and
//! decides what each one means for the wire.
//!
//! [`EscapeResponse`]: millrace_core::EscapeResponse

mod content;
mod json;
mod registry;
pub mod stream;
mod value;

pub use content::{content_type_for, produce_static, StaticContent};
pub use json::produce_json;
pub use registry::{Producer, Registry, SelfProducing};
pub use stream::{Chunk, ChunkStream, Interrupt};
pub use value::AppValue;
