//! The resolution seam between the pipeline and application code.

use async_trait::async_trait;
use millrace_core::{EscapeResponse, FrameSender, RequestState};
use millrace_produce::AppValue;

/// What resolving a path produced.
pub enum Resolution {
    /// A value for the content registry to stream.
    Value(Box<dyn AppValue>),
    /// A prebuilt response to send as-is.
    Escape(EscapeResponse),
    /// Nothing lives at the requested path.
    NotFound,
}

impl Resolution {
    /// Wrap any producible value.
    pub fn value(value: impl AppValue + 'static) -> Self {
        Self::Value(Box::new(value))
    }
}

/// Maps a request path to an application value.
///
/// The pipeline calls this once per request with the path split into
/// segments (leading slash removed, empty segments kept), the mutable
/// request state, and a frame sender for resolvers that answer the
/// transport themselves. A resolver that has already sent frames should
/// still return [`Resolution::NotFound`] or a [`Resolution::Value`]; the
/// pipeline notices the started response and never emits a second header
/// frame.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(
        &self,
        segments: &[&str],
        state: &mut RequestState,
        send: &mut dyn FrameSender,
    ) -> anyhow::Result<Resolution>;
}
