//! Translation between hyper exchanges and the frame protocol.
//!
//! One hyper request becomes one pipeline exchange: the request head turns
//! into an [`HttpScope`], the request body is pumped into inbound events,
//! and the pipeline's outbound frames stream back as the hyper response
//! body. The client going away surfaces to the pipeline as a disconnect
//! event or a closed sender, whichever fires first.
//!
//! [`HttpScope`]: millrace_core::HttpScope

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use bytes::Bytes;
use futures_core::Stream;
use http_body_util::{BodyExt, StreamBody};
use hyper::body::{Frame, Incoming};
use hyper::{Request, Response, StatusCode};
use millrace_core::mem::EventInjector;
use millrace_core::{
    FrameSender, HeaderList, HttpScope, InboundEvent, OutboundFrame, Scope, TransportClosed,
    TransportResult, mem,
};
use millrace_pipeline::Pipeline;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// Serve one hyper request through the pipeline.
pub(crate) async fn handle_request(
    pipeline: Arc<Pipeline>,
    req: Request<Incoming>,
) -> Result<Response<StreamBody<FrameBody>>, Infallible> {
    let scope = scope_of(&req);

    let (events, mut event_rx) = mem::event_channel();
    // Held by the response body; every clone gone reads as a disconnect.
    let keepalive = events.clone();
    tokio::spawn(pump_request_body(req.into_body(), events));

    let (frame_tx, mut frames) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut tx = ChannelSender { tx: frame_tx };
        if let Err(TransportClosed) = pipeline
            .handle(Scope::Http(scope), &mut event_rx, &mut tx)
            .await
        {
            debug!("client closed the connection mid-response");
        }
    });

    let (status, headers) = loop {
        match frames.recv().await {
            Some(OutboundFrame::ResponseStart { status, headers }) => break (status, headers),
            Some(other) => {
                warn!(frame = ?other, "frame before the start frame, dropping it");
            }
            None => {
                error!("pipeline ended without a start frame");
                return Ok(plain_500());
            }
        }
    };

    let body = FrameBody::new(frames, Some(keepalive));
    match framed_response(status, &headers, body) {
        Ok(response) => Ok(response),
        Err(err) => {
            error!(error = %err, "response metadata rejected");
            Ok(plain_500())
        }
    }
}

/// Request head as a pipeline scope.
fn scope_of(req: &Request<Incoming>) -> HttpScope {
    let mut scope = HttpScope::new(req.method().as_str(), req.uri().path());
    for (name, value) in req.headers() {
        match value.to_str() {
            Ok(value) => scope.headers.insert(name.as_str(), value),
            Err(_) => warn!(header = %name, "skipping non-UTF-8 header value"),
        }
    }
    scope
}

/// Forward request body data into inbound events.
///
/// Body exhaustion is marked with an empty closing chunk; a body error
/// means the client is gone.
async fn pump_request_body(mut body: Incoming, events: EventInjector) {
    loop {
        match body.frame().await {
            Some(Ok(frame)) => {
                // Trailers are dropped; only data frames matter here.
                if let Ok(data) = frame.into_data() {
                    events.push(InboundEvent::Request {
                        body: data,
                        more_body: true,
                    });
                }
            }
            Some(Err(err)) => {
                debug!(error = %err, "request body ended with an error");
                events.disconnect();
                return;
            }
            None => {
                events.push(InboundEvent::Request {
                    body: Bytes::new(),
                    more_body: false,
                });
                return;
            }
        }
    }
}

struct ChannelSender {
    tx: mpsc::UnboundedSender<OutboundFrame>,
}

#[async_trait]
impl FrameSender for ChannelSender {
    async fn send(&mut self, frame: OutboundFrame) -> TransportResult<()> {
        self.tx.send(frame).map_err(|_| TransportClosed)
    }
}

fn framed_response(
    status: u16,
    headers: &HeaderList,
    body: FrameBody,
) -> Result<Response<StreamBody<FrameBody>>, http::Error> {
    let mut builder = Response::builder()
        .status(StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR));
    for header in headers.iter() {
        builder = builder.header(header.name.as_str(), header.value.as_str());
    }
    builder.body(StreamBody::new(body))
}

fn plain_500() -> Response<StreamBody<FrameBody>> {
    let (tx, frames) = mpsc::unbounded_channel();
    let _ = tx.send(OutboundFrame::final_body("Internal Server Error"));
    drop(tx);

    let mut response = Response::new(StreamBody::new(FrameBody::new(frames, None)));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

/// Response body frames as a hyper body stream.
///
/// Ends at the frame with `more_body == false`, or when the pipeline task
/// drops its sender. Holds the inbound injector so that dropping the body,
/// which is what hyper does when the client disconnects, turns further
/// receives into disconnect events.
pub(crate) struct FrameBody {
    frames: mpsc::UnboundedReceiver<OutboundFrame>,
    _keepalive: Option<EventInjector>,
    done: bool,
}

impl FrameBody {
    fn new(frames: mpsc::UnboundedReceiver<OutboundFrame>, keepalive: Option<EventInjector>) -> Self {
        Self {
            frames,
            _keepalive: keepalive,
            done: false,
        }
    }
}

impl Stream for FrameBody {
    type Item = Result<Frame<Bytes>, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if this.done {
                return Poll::Ready(None);
            }
            match this.frames.poll_recv(cx) {
                Poll::Ready(Some(OutboundFrame::ResponseBody { body, more_body })) => {
                    if !more_body {
                        this.done = true;
                    }
                    return Poll::Ready(Some(Ok(Frame::data(body))));
                }
                Poll::Ready(Some(other)) => {
                    warn!(frame = ?other, "unexpected frame while streaming the body");
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
