//! Channel-backed in-memory transport.
//!
//! Used by the integration tests and demos to drive the pipeline without a
//! socket: an [`EventInjector`] scripts inbound events while a [`FrameLog`]
//! collects whatever the pipeline sends. The receiver stays pending while
//! its injector is alive, which is exactly what a streaming continuation
//! needs to race against.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::frame::{InboundEvent, OutboundFrame};
use crate::transport::{FrameReceiver, FrameSender, TransportClosed, TransportResult};

/// Create a linked injector/receiver pair for inbound events.
pub fn event_channel() -> (EventInjector, MemoryReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventInjector { tx }, MemoryReceiver { rx })
}

/// Create a linked sender/log pair for outbound frames.
pub fn frame_channel() -> (MemorySender, FrameLog) {
    let (tx, rx) = mpsc::unbounded_channel();
    (MemorySender { tx }, FrameLog { rx })
}

/// Pushes scripted events into a [`MemoryReceiver`].
///
/// Dropping every clone of the injector makes the receiver report
/// [`InboundEvent::Disconnect`], mirroring a client that went away.
#[derive(Debug, Clone)]
pub struct EventInjector {
    tx: mpsc::UnboundedSender<InboundEvent>,
}

impl EventInjector {
    pub fn push(&self, event: InboundEvent) {
        // A dropped receiver means the exchange is over; nothing to signal.
        let _ = self.tx.send(event);
    }

    /// Push one body chunk.
    pub fn push_body(&self, chunk: &[u8], more_body: bool) {
        self.push(InboundEvent::Request {
            body: Bytes::copy_from_slice(chunk),
            more_body,
        });
    }

    pub fn disconnect(&self) {
        self.push(InboundEvent::Disconnect);
    }
}

/// In-memory [`FrameReceiver`].
#[derive(Debug)]
pub struct MemoryReceiver {
    rx: mpsc::UnboundedReceiver<InboundEvent>,
}

#[async_trait]
impl FrameReceiver for MemoryReceiver {
    async fn receive(&mut self) -> TransportResult<InboundEvent> {
        match self.rx.recv().await {
            Some(event) => Ok(event),
            None => Ok(InboundEvent::Disconnect),
        }
    }
}

/// In-memory [`FrameSender`].
#[derive(Debug)]
pub struct MemorySender {
    tx: mpsc::UnboundedSender<OutboundFrame>,
}

#[async_trait]
impl FrameSender for MemorySender {
    async fn send(&mut self, frame: OutboundFrame) -> TransportResult<()> {
        self.tx.send(frame).map_err(|_| TransportClosed)
    }
}

/// Collects frames sent through a [`MemorySender`].
#[derive(Debug)]
pub struct FrameLog {
    rx: mpsc::UnboundedReceiver<OutboundFrame>,
}

impl FrameLog {
    /// Wait for the next frame; `None` once every sender is gone.
    pub async fn next(&mut self) -> Option<OutboundFrame> {
        self.rx.recv().await
    }

    /// Take every frame already sent, without waiting.
    pub fn drain(&mut self) -> Vec<OutboundFrame> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.rx.try_recv() {
            frames.push(frame);
        }
        frames
    }
}
