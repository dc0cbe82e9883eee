//! The request pipeline: one transport exchange in, one framed response out.
//!
//! [`Pipeline::handle`] drives a whole exchange. For HTTP scopes the walk
//! is fixed: classify the expected output from the path suffix, decode the
//! body when its content type names a known decoder, hand the path to the
//! [`Resolver`], and stream whatever the content registry makes of the
//! resolved value. Lifecycle scopes run the startup/shutdown
//! acknowledgement loop instead.
//!
//! # Failure Model
//!
//! Nothing application-level escapes [`Pipeline::handle`]. Oversized
//! bodies become 413 responses before any resolver work happens, resolver
//! errors become 500s, unresolved paths become 404s, and producer failures
//! mid-stream close the response with an error document. The only error
//! the caller sees is [`TransportClosed`], meaning the peer is gone and
//! there is nobody left to answer.
//!
//! [`TransportClosed`]: millrace_core::TransportClosed

mod assembler;
mod lifespan;
mod resolver;

pub use assembler::Pipeline;
pub use resolver::{Resolution, Resolver};
