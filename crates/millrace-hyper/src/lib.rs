//! Hyper transport binding for the millrace pipeline.
//!
//! [`HttpHost`] owns the listen socket and the accept loop; the bridge
//! behind it translates each hyper request into a pipeline exchange and
//! streams the outbound frames back, so streaming responses and
//! server-sent-event continuations work without buffering. The pipeline
//! itself never sees hyper types; it talks frames on both sides.

mod bridge;
mod host;

pub use host::HttpHost;
