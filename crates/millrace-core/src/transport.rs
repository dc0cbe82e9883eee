//! Transport contracts between the pipeline and a concrete server binding.
//!
//! A binding hands the pipeline one [`FrameReceiver`] and one
//! [`FrameSender`] per connection scope. Both are object-safe so the
//! pipeline, resolvers, and continuations can share them as trait objects
//! without knowing which binding is underneath.

use async_trait::async_trait;
use thiserror::Error;

use crate::frame::{InboundEvent, OutboundFrame};

/// The binding is gone; no further events or frames can move.
///
/// This is the only error that crosses the pipeline boundary. Every
/// application-level failure is turned into response frames instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transport closed")]
pub struct TransportClosed;

/// Result type alias for transport operations.
pub type TransportResult<T> = Result<T, TransportClosed>;

/// Source of inbound events for one request scope.
#[async_trait]
pub trait FrameReceiver: Send {
    /// Wait for the next inbound event.
    ///
    /// Implementations block until an event is available and must stay
    /// cancel-safe: dropping the returned future abandons the wait without
    /// losing the transport.
    async fn receive(&mut self) -> TransportResult<InboundEvent>;
}

/// Sink for outbound frames of one request scope.
#[async_trait]
pub trait FrameSender: Send {
    /// Emit one frame toward the client.
    async fn send(&mut self, frame: OutboundFrame) -> TransportResult<()>;
}
