//! The HTTP/1.1 host process.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context as _;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use millrace_core::{InboundEvent, OutboundFrame, Scope, mem};
use millrace_pipeline::Pipeline;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::bridge;

/// Binds a TCP port and serves the pipeline until told to shut down.
///
/// Each connection gets its own task; each request becomes one pipeline
/// exchange. The pipeline's lifecycle scope is started before the first
/// accept and wound down after the last.
pub struct HttpHost {
    bind_addr: SocketAddr,
    pipeline: Arc<Pipeline>,
}

impl HttpHost {
    pub fn new(bind_addr: SocketAddr, pipeline: Pipeline) -> Self {
        Self {
            bind_addr,
            pipeline: Arc::new(pipeline),
        }
    }

    /// Run the server until the shutdown signal changes.
    pub async fn serve(self, shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.bind_addr)
            .await
            .context("failed to bind http host")?;
        info!(addr = %self.bind_addr, "http host listening");
        self.serve_on(listener, shutdown).await
    }

    async fn serve_on(
        self,
        listener: TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        let mut lifecycle = Lifecycle::start(self.pipeline.clone());
        lifecycle.startup().await?;

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer_addr) = accepted.context("accept failed")?;
                    let pipeline = self.pipeline.clone();
                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);
                        let service =
                            service_fn(move |req| bridge::handle_request(pipeline.clone(), req));
                        if let Err(err) = http1::Builder::new().serve_connection(io, service).await
                        {
                            debug!(%peer_addr, error = %err, "connection ended with an error");
                        }
                    });
                }
                _ = shutdown.changed() => {
                    info!("http host shutting down");
                    break;
                }
            }
        }

        lifecycle.shutdown().await
    }
}

/// The pipeline's lifecycle scope, run over an in-memory channel pair.
struct Lifecycle {
    events: mem::EventInjector,
    acks: mem::FrameLog,
    task: tokio::task::JoinHandle<()>,
}

impl Lifecycle {
    fn start(pipeline: Arc<Pipeline>) -> Self {
        let (events, mut rx) = mem::event_channel();
        let (mut tx, acks) = mem::frame_channel();
        let task = tokio::spawn(async move {
            if pipeline
                .handle(Scope::Lifespan, &mut rx, &mut tx)
                .await
                .is_err()
            {
                warn!("lifecycle channel closed early");
            }
        });
        Self { events, acks, task }
    }

    async fn startup(&mut self) -> anyhow::Result<()> {
        self.events.push(InboundEvent::Startup);
        match self.acks.next().await {
            Some(OutboundFrame::StartupComplete) => Ok(()),
            other => anyhow::bail!("unexpected startup acknowledgement: {other:?}"),
        }
    }

    async fn shutdown(mut self) -> anyhow::Result<()> {
        self.events.push(InboundEvent::Shutdown);
        match self.acks.next().await {
            Some(OutboundFrame::ShutdownComplete) => {}
            other => warn!(ack = ?other, "unexpected shutdown acknowledgement"),
        }
        let _ = self.task.await;
        Ok(())
    }
}
