//! Escape responses: prebuilt responses any layer can return or raise.
//!
//! An [`EscapeResponse`] bundles the header frame and payload of a complete
//! response. Resolvers return one to answer a request directly; producers
//! surface one mid-stream to replace whatever the stream would have said.
//! With a [`Continuation`] attached, the escape also takes over the
//! transport after its payload frame and owns every remaining frame,
//! including the final one.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;

use crate::header::HeaderList;
use crate::transport::{FrameReceiver, FrameSender};

/// Status and headers of a response, ready to emit as a start frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartFrame {
    pub status: u16,
    pub headers: HeaderList,
}

impl StartFrame {
    pub fn new(status: u16, headers: HeaderList) -> Self {
        Self { status, headers }
    }
}

/// Response payload, textual or raw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Binary(Bytes),
}

impl Payload {
    pub fn into_bytes(self) -> Bytes {
        match self {
            Self::Text(text) => Bytes::from(text),
            Self::Binary(bytes) => bytes,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Self::Binary(bytes)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Binary(Bytes::from(bytes))
    }
}

/// Follow-up work an escape response hands the transport to.
///
/// Runs after the escape's header and payload frames have been sent. From
/// that point the continuation owns the exchange: it emits every remaining
/// body frame, the final one included, racing inbound events as it sees
/// fit. Consumed on use; escapes carrying one are single-shot.
#[async_trait]
pub trait Continuation: Send {
    async fn run(self: Box<Self>, rx: &mut dyn FrameReceiver, tx: &mut dyn FrameSender);
}

/// A complete response as a value: header frame, payload, and optionally a
/// continuation that streams the rest.
pub struct EscapeResponse {
    start: StartFrame,
    payload: Payload,
    continuation: Option<Box<dyn Continuation>>,
}

impl EscapeResponse {
    pub fn new(start: StartFrame, payload: impl Into<Payload>) -> Self {
        Self {
            start,
            payload: payload.into(),
            continuation: None,
        }
    }

    /// A plain-text response with the given status.
    pub fn with_status(status: u16, body: impl Into<Payload>) -> Self {
        Self::new(
            StartFrame::new(status, HeaderList::from_pairs([("content-type", "text/plain")])),
            body,
        )
    }

    /// Append a header to the start frame.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.start.headers.insert(name, value);
        self
    }

    pub fn with_continuation(mut self, continuation: impl Continuation + 'static) -> Self {
        self.continuation = Some(Box::new(continuation));
        self
    }

    pub fn start(&self) -> &StartFrame {
        &self.start
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn has_continuation(&self) -> bool {
        self.continuation.is_some()
    }

    pub fn into_parts(self) -> (StartFrame, Payload, Option<Box<dyn Continuation>>) {
        (self.start, self.payload, self.continuation)
    }
}

impl fmt::Debug for EscapeResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EscapeResponse")
            .field("start", &self.start)
            .field("payload", &self.payload)
            .field("continuation", &self.continuation.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::OutboundFrame;
    use crate::mem;

    #[test]
    fn with_status_builds_plain_text() {
        let escape = EscapeResponse::with_status(404, "gone");
        assert_eq!(escape.start().status, 404);
        assert_eq!(escape.start().headers.get("content-type"), Some("text/plain"));
        assert_eq!(escape.payload(), &Payload::Text("gone".to_string()));
        assert!(!escape.has_continuation());
    }

    #[test]
    fn with_header_appends() {
        let escape = EscapeResponse::with_status(200, "ok").with_header("cache-control", "no-cache");
        assert_eq!(escape.start().headers.get("cache-control"), Some("no-cache"));
    }

    struct FinalFrame;

    #[async_trait]
    impl Continuation for FinalFrame {
        async fn run(self: Box<Self>, _rx: &mut dyn FrameReceiver, tx: &mut dyn FrameSender) {
            let _ = tx.send(OutboundFrame::final_body("done")).await;
        }
    }

    #[tokio::test]
    async fn continuation_runs_against_the_transport() {
        let escape = EscapeResponse::with_status(200, "ok").with_continuation(FinalFrame);
        assert!(escape.has_continuation());

        let (_injector, mut rx) = mem::event_channel();
        let (mut tx, mut log) = mem::frame_channel();
        let (_, _, continuation) = escape.into_parts();
        continuation
            .unwrap()
            .run(&mut rx, &mut tx)
            .await;
        assert_eq!(log.drain(), vec![OutboundFrame::final_body("done")]);
    }

    #[test]
    fn payload_conversions() {
        assert_eq!(Payload::from("x"), Payload::Text("x".to_string()));
        assert_eq!(
            Payload::from(Bytes::from_static(b"\x00\x01")).into_bytes(),
            Bytes::from_static(b"\x00\x01")
        );
        assert!(Payload::from("").is_empty());
    }
}
