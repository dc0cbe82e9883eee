//! Server-sent events over the frame protocol.
//!
//! [`channel`] returns a cloneable [`SseSender`] and an [`EventSource`].
//! The source, wrapped via [`EventSource::into_value`], is returned by a
//! resolver like any other value; producing it emits an escape response
//! whose header frame announces `text/event-stream` and whose payload is an
//! initial `ping` event. The escape's continuation then owns the exchange:
//! it races queued events against inbound transport activity and streams
//! `event:`/`data:` frames until the client goes away, every sender is
//! dropped, or the task is cancelled.
//!
//! # Shutdown
//!
//! Inbound activity of any kind, including disconnect, ends the stream
//! with one final empty `more_body == false` frame so the HTTP exchange
//! closes cleanly. External cancellation drops the writer at an await
//! point and sends nothing further.

use std::fmt;
use std::sync::Mutex;

use async_trait::async_trait;
use millrace_core::{
    Continuation, EscapeResponse, FrameReceiver, FrameSender, HeaderList, OutboundFrame, Payload,
    RequestState, StartFrame,
};
use millrace_produce::stream;
use millrace_produce::{AppValue, ChunkStream, Producer, SelfProducing};
use tokio::sync::mpsc;
use tracing::debug;

/// One server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    event: Option<String>,
    data: String,
}

impl SseEvent {
    /// A bare data event.
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            event: None,
            data: data.into(),
        }
    }

    /// An event with an explicit `event:` name.
    pub fn named(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: Some(event.into()),
            data: data.into(),
        }
    }

    /// Render the wire form: optional `event:` line, one `data:` line per
    /// line of data, blank-line terminated.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        if let Some(event) = &self.event {
            out.push_str("event: ");
            out.push_str(event);
            out.push('\n');
        }
        for line in self.data.split('\n') {
            out.push_str("data: ");
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
        out
    }
}

/// Create a linked sender/source pair.
pub fn channel() -> (SseSender, EventSource) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        SseSender { tx },
        EventSource {
            events: Mutex::new(Some(rx)),
        },
    )
}

/// Queues events for a connected client. Cheap to clone; dropping every
/// clone ends the stream.
#[derive(Debug, Clone)]
pub struct SseSender {
    tx: mpsc::UnboundedSender<SseEvent>,
}

impl SseSender {
    /// Queue an event. Returns `false` once the stream is gone.
    pub fn send(&self, event: SseEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// The consuming end of an SSE channel.
///
/// An event source streams at most once: producing it a second time fails,
/// because the first production took the queue with it.
pub struct EventSource {
    events: Mutex<Option<mpsc::UnboundedReceiver<SseEvent>>>,
}

impl EventSource {
    /// Wrap into a value a resolver can return. Dispatch finds the
    /// embedded producer through the self-producing path, so no registry
    /// entry is needed.
    pub fn into_value(self) -> SelfProducing {
        SelfProducing::new("event stream", self)
    }
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("event stream")
    }
}

impl Producer for EventSource {
    fn produce(&self, _value: &dyn AppValue, _state: &RequestState) -> ChunkStream {
        let Some(events) = self.events.lock().expect("event source lock").take() else {
            return stream::failure(anyhow::anyhow!("event source is already streaming"));
        };
        let escape = EscapeResponse::new(
            StartFrame::new(
                200,
                HeaderList::from_pairs([
                    ("content-type", "text/event-stream; charset=UTF-8"),
                    ("cache-control", "no-cache"),
                ]),
            ),
            Payload::Text(SseEvent::named("ping", "{}").encode()),
        )
        .with_continuation(EventWriter { events });
        stream::escape(escape)
    }
}

/// The continuation that pumps queued events to the client.
struct EventWriter {
    events: mpsc::UnboundedReceiver<SseEvent>,
}

#[async_trait]
impl Continuation for EventWriter {
    async fn run(self: Box<Self>, rx: &mut dyn FrameReceiver, tx: &mut dyn FrameSender) {
        let mut events = self.events;
        loop {
            tokio::select! {
                inbound = rx.receive() => {
                    match inbound {
                        Ok(event) => debug!(?event, "inbound activity ends the event stream"),
                        Err(_) => debug!("transport closed under the event stream"),
                    }
                    break;
                }
                queued = events.recv() => {
                    match queued {
                        Some(event) => {
                            if tx.send(OutboundFrame::body(event.encode())).await.is_err() {
                                // Client is gone; no closing frame to send.
                                return;
                            }
                        }
                        None => {
                            debug!("every event sender dropped; closing the stream");
                            break;
                        }
                    }
                }
            }
        }
        let _ = tx.send(OutboundFrame::final_body("")).await;
    }
}
