//! Response assembly for HTTP scopes.
//!
//! The assembler is a small state machine. A request starts with path
//! classification, optionally passes through body decoding, is resolved to
//! a value, and then either a direct escape response or a produced chunk
//! stream reaches the wire. Headers go out exactly once; after the first
//! frame only body frames may follow, so late failures can still append a
//! payload but never change the status line.

use std::sync::Arc;

use async_trait::async_trait;
use futures_core::Stream;
use millrace_core::{
    DecodeError, FrameReceiver, FrameSender, HeaderList, HttpScope, OutboundFrame, PipelineConfig,
    RequestState, Scope, TransportResult, error_body,
};
use millrace_decode::{BodyKind, decode_body};
use millrace_produce::{AppValue, Chunk, Interrupt, Registry};
use tracing::{debug, error, warn};

use crate::lifespan;
use crate::resolver::{Resolution, Resolver};

const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";
const HTML_CONTENT_TYPE: &str = "text/html; charset=UTF-8";

/// The request pipeline: resolver, content registry, and tunables.
///
/// One instance serves any number of concurrent exchanges; [`handle`] only
/// takes `&self`.
///
/// [`handle`]: Pipeline::handle
pub struct Pipeline {
    resolver: Arc<dyn Resolver>,
    registry: Arc<Registry>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(resolver: impl Resolver + 'static, registry: Registry) -> Self {
        Self {
            resolver: Arc::new(resolver),
            registry: Arc::new(registry),
            config: PipelineConfig::default(),
        }
    }

    /// Replace the default configuration.
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Drive one transport exchange to completion.
    ///
    /// `Err(TransportClosed)` means the peer vanished mid-response; every
    /// application-level failure becomes a response frame instead.
    pub async fn handle(
        &self,
        scope: Scope,
        rx: &mut dyn FrameReceiver,
        tx: &mut dyn FrameSender,
    ) -> TransportResult<()> {
        match scope {
            Scope::Lifespan => lifespan::run(rx, tx).await,
            Scope::Http(scope) => self.handle_http(scope, rx, tx).await,
        }
    }

    async fn handle_http(
        &self,
        scope: HttpScope,
        rx: &mut dyn FrameReceiver,
        tx: &mut dyn FrameSender,
    ) -> TransportResult<()> {
        debug!(method = %scope.method, path = %scope.path, "handling request");

        let (accept, mut content_type) = classify(&scope.path);
        let mut state = RequestState::new(scope.method.clone(), scope.path.clone());
        state.accept = accept;

        if let Some(header) = scope.headers.get("content-type") {
            match BodyKind::from_content_type(header) {
                BodyKind::Unknown => {
                    warn!(content_type = header, "no decoder for content type, body left undecoded");
                }
                kind => {
                    // A client speaking JSON wants JSON back, whatever the
                    // path suffix said.
                    if kind == BodyKind::Json {
                        state.accept =
                            vec!["application/json".to_string(), "*/*".to_string()];
                        content_type = JSON_CONTENT_TYPE.to_string();
                    }
                    match decode_body(rx, &kind, self.config.max_body_bytes).await {
                        Ok(decoded) => state.body = decoded,
                        Err(err @ DecodeError::PayloadTooLarge { .. }) => {
                            warn!(path = %state.path, error = %err, "rejecting oversized body");
                            return send_error(tx, 413, "Payload Too Large", &err.to_string())
                                .await;
                        }
                        Err(DecodeError::Malformed(reason)) => {
                            warn!(path = %state.path, reason = %reason, "ignoring malformed body");
                        }
                        Err(DecodeError::ClientGone) => {
                            debug!(path = %state.path, "client left mid-body");
                            return Ok(());
                        }
                    }
                }
            }
        }

        let path = state.path.clone();
        let segments: Vec<&str> = path.split('/').skip(1).collect();
        let mut tracked = TrackedSender::new(tx);

        let resolution = match self
            .resolver
            .resolve(&segments, &mut state, &mut tracked)
            .await
        {
            Ok(resolution) => resolution,
            Err(err) => {
                error!(path = %path, error = %err, "resolver failed");
                if tracked.started() {
                    // Headers already on the wire; nothing safe to add.
                    return Ok(());
                }
                return send_error(&mut tracked, 500, "Internal Server Error", &err.to_string())
                    .await;
            }
        };

        match resolution {
            Resolution::NotFound => {
                debug!(path = %path, "nothing resolved");
                send_error(
                    &mut tracked,
                    404,
                    "Not Found",
                    &format!("Resource not found: {path}"),
                )
                .await
            }
            Resolution::Escape(escape) => {
                debug!(status = escape.start().status, "direct escape response");
                if escape.has_continuation() {
                    warn!("continuation on a direct escape response is never run");
                }
                let (start, payload, _continuation) = escape.into_parts();
                tracked
                    .send(OutboundFrame::start(start.status, start.headers))
                    .await?;
                tracked
                    .send(OutboundFrame::final_body(payload.into_bytes()))
                    .await
            }
            Resolution::Value(value) => {
                self.stream_value(value.as_ref(), &state, &content_type, rx, &mut tracked)
                    .await
            }
        }
    }

    /// Pull chunks from the registry's stream and frame each one.
    async fn stream_value(
        &self,
        value: &dyn AppValue,
        state: &RequestState,
        content_type: &str,
        rx: &mut dyn FrameReceiver,
        tx: &mut TrackedSender<'_>,
    ) -> TransportResult<()> {
        let mut stream = self.registry.produce(value, state);
        let mut first = true;
        loop {
            let item = std::future::poll_fn(|cx| stream.as_mut().poll_next(cx)).await;
            match item {
                Some(Ok(Chunk::Escape(escape))) if first => {
                    first = false;
                    let (start, payload, continuation) = escape.into_parts();
                    if !tx.started() {
                        tx.send(OutboundFrame::start(start.status, start.headers))
                            .await?;
                    }
                    tx.send(OutboundFrame::body(payload.into_bytes())).await?;
                    if let Some(continuation) = continuation {
                        debug!("continuation takes over the exchange");
                        continuation.run(rx, tx).await;
                        return Ok(());
                    }
                }
                Some(Ok(Chunk::Data(payload))) if first => {
                    first = false;
                    if !tx.started() {
                        let headers = HeaderList::from_pairs([("content-type", content_type)]);
                        tx.send(OutboundFrame::start(200, headers)).await?;
                    }
                    tx.send(OutboundFrame::body(payload.into_bytes())).await?;
                }
                Some(Ok(Chunk::Escape(escape))) => {
                    // Headers are out; the escape degrades to its payload.
                    warn!(
                        status = escape.start().status,
                        "escape response mid-stream, emitting its payload only"
                    );
                    let (_start, payload, _continuation) = escape.into_parts();
                    tx.send(OutboundFrame::body(payload.into_bytes())).await?;
                }
                Some(Ok(Chunk::Data(payload))) => {
                    tx.send(OutboundFrame::body(payload.into_bytes())).await?;
                }
                Some(Err(Interrupt::Escape(escape))) => {
                    debug!(
                        status = escape.start().status,
                        "stream cut short by an escape response"
                    );
                    let (start, payload, _continuation) = escape.into_parts();
                    if !tx.started() {
                        tx.send(OutboundFrame::start(start.status, start.headers))
                            .await?;
                    }
                    return tx
                        .send(OutboundFrame::final_body(payload.into_bytes()))
                        .await;
                }
                Some(Err(Interrupt::Failure(err))) => {
                    error!(error = %err, "producer failed mid-stream");
                    if !tx.started() {
                        tx.send(OutboundFrame::start(500, json_headers())).await?;
                    }
                    return tx
                        .send(OutboundFrame::final_body(error_body(
                            "Internal Server Error",
                            &err.to_string(),
                        )))
                        .await;
                }
                None => {
                    // An empty stream still owes the client a status line.
                    if !tx.started() {
                        let headers = HeaderList::from_pairs([("content-type", content_type)]);
                        tx.send(OutboundFrame::start(200, headers)).await?;
                    }
                    return tx.send(OutboundFrame::final_body("\n")).await;
                }
            }
        }
    }
}

/// Expected output for a path: accept list, most specific first, plus the
/// default content type for ordinary streamed chunks.
fn classify(path: &str) -> (Vec<String>, String) {
    if path.ends_with(".json") {
        (
            vec!["application/json".to_string(), "*/*".to_string()],
            JSON_CONTENT_TYPE.to_string(),
        )
    } else if path.ends_with(".html") {
        (
            vec!["text/html".to_string(), "*/*".to_string()],
            HTML_CONTENT_TYPE.to_string(),
        )
    } else {
        (vec!["*/*".to_string()], HTML_CONTENT_TYPE.to_string())
    }
}

fn json_headers() -> HeaderList {
    HeaderList::from_pairs([("content-type", JSON_CONTENT_TYPE)])
}

async fn send_error(
    tx: &mut dyn FrameSender,
    status: u16,
    error: &str,
    message: &str,
) -> TransportResult<()> {
    tx.send(OutboundFrame::start(status, json_headers())).await?;
    tx.send(OutboundFrame::final_body(error_body(error, message)))
        .await
}

/// Wraps a sender and remembers whether a start frame has passed through.
///
/// Error paths consult it: headers, once sent, cannot be altered, only
/// followed by more body.
struct TrackedSender<'a> {
    inner: &'a mut dyn FrameSender,
    started: bool,
}

impl<'a> TrackedSender<'a> {
    fn new(inner: &'a mut dyn FrameSender) -> Self {
        Self {
            inner,
            started: false,
        }
    }

    fn started(&self) -> bool {
        self.started
    }
}

#[async_trait]
impl FrameSender for TrackedSender<'_> {
    async fn send(&mut self, frame: OutboundFrame) -> TransportResult<()> {
        if matches!(frame, OutboundFrame::ResponseStart { .. }) {
            self.started = true;
        }
        self.inner.send(frame).await
    }
}
