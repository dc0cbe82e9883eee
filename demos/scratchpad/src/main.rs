//! scratchpad — a millrace demo server.
//!
//! Serves an in-memory JSON tree over the full pipeline:
//! - `GET /notes/7` walks the tree by path segment
//! - `POST /notes` with a JSON body stores it at that path
//! - `GET /watch` streams change notifications as server-sent events
//! - a `.json` or `.html` suffix picks the rendering without changing
//!   the lookup
//!
//! # Usage
//!
//! ```text
//! scratchpad --port 8080
//! curl -X POST localhost:8080/notes -H 'content-type: application/json' -d '{"7":"milk"}'
//! curl localhost:8080/notes/7.json
//! curl -N localhost:8080/watch
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::RwLock;

use async_trait::async_trait;
use clap::Parser;
use millrace_core::{DecodedBody, FrameSender, PipelineConfig, RequestState};
use millrace_hyper::HttpHost;
use millrace_pipeline::{Pipeline, Resolution, Resolver};
use millrace_produce::Registry;
use millrace_sse::SseEvent;
use serde_json::{Value, json};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "scratchpad", about = "Millrace demo server")]
struct Cli {
    /// Port to listen on.
    #[arg(long, default_value = "8080")]
    port: u16,

    /// Optional TOML file with pipeline settings.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,scratchpad=debug,millrace_pipeline=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };

    // JSON documents render as JSON whatever the client accepts.
    let registry = Registry::with_defaults();
    registry.register::<Value, _>("*/*", millrace_produce::produce_json);

    let (changes, _) = broadcast::channel(64);
    let scratchpad = Scratchpad {
        root: RwLock::new(json!({})),
        changes,
    };

    let pipeline = Pipeline::new(scratchpad, registry).with_config(config);
    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    let host = HttpHost::new(addr, pipeline);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    host.serve(shutdown_rx).await
}

/// The demo application: a JSON tree plus a change feed for watchers.
struct Scratchpad {
    root: RwLock<Value>,
    changes: broadcast::Sender<String>,
}

#[async_trait]
impl Resolver for Scratchpad {
    async fn resolve(
        &self,
        segments: &[&str],
        state: &mut RequestState,
        _send: &mut dyn FrameSender,
    ) -> anyhow::Result<Resolution> {
        let segments = normalize(segments);

        if segments == ["watch"] {
            return Ok(Resolution::value(self.watcher()));
        }

        if matches!(state.method.as_str(), "POST" | "PUT") {
            let Some(DecodedBody::Json(body)) = state.body.take() else {
                debug!(path = %state.path, "write without a JSON body");
                return Ok(Resolution::NotFound);
            };
            let stored = {
                let mut root = self.root.write().expect("scratchpad lock");
                store(&mut root, &segments, body)
            };
            if !stored {
                return Ok(Resolution::NotFound);
            }
            let location = format!("/{}", segments.join("/"));
            info!(path = %location, "stored");
            let _ = self.changes.send(location);
            return Ok(Resolution::value(json!({"ok": true})));
        }

        let root = self.root.read().expect("scratchpad lock");
        match lookup(&root, &segments) {
            Some(value) => Ok(Resolution::value(value.clone())),
            None => Ok(Resolution::NotFound),
        }
    }
}

impl Scratchpad {
    /// A per-request event source fed by the change broadcast.
    fn watcher(&self) -> millrace_produce::SelfProducing {
        let (events, source) = millrace_sse::channel();
        let mut feed = self.changes.subscribe();
        tokio::spawn(async move {
            loop {
                match feed.recv().await {
                    Ok(change) => {
                        if !events.send(SseEvent::named("change", change)) {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "watcher fell behind the change feed");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        source.into_value()
    }
}

/// Drop empty segments and the rendering suffix of the last one.
fn normalize<'a>(segments: &[&'a str]) -> Vec<&'a str> {
    let mut segments: Vec<&str> = segments
        .iter()
        .copied()
        .filter(|s| !s.is_empty())
        .collect();
    if let Some(last) = segments.last_mut() {
        *last = trim_render_suffix(last);
    }
    segments
}

fn trim_render_suffix(segment: &str) -> &str {
    segment
        .strip_suffix(".json")
        .or_else(|| segment.strip_suffix(".html"))
        .unwrap_or(segment)
}

/// Walk the tree by object key or array index.
fn lookup<'a>(root: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    let mut current = root;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(*segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Store `body` at the path, creating nothing along the way. An empty
/// path replaces the whole tree.
fn store(root: &mut Value, segments: &[&str], body: Value) -> bool {
    let Some((last, parents)) = segments.split_last() else {
        *root = body;
        return true;
    };
    let mut current = root;
    for segment in parents {
        current = match current {
            Value::Object(map) => match map.get_mut(*segment) {
                Some(next) => next,
                None => return false,
            },
            Value::Array(items) => {
                let Ok(index) = segment.parse::<usize>() else {
                    return false;
                };
                match items.get_mut(index) {
                    Some(next) => next,
                    None => return false,
                }
            }
            _ => return false,
        };
    }
    match current {
        Value::Object(map) => {
            map.insert((*last).to_string(), body);
            true
        }
        Value::Array(items) => match last.parse::<usize>() {
            Ok(index) if index < items.len() => {
                items[index] = body;
                true
            }
            _ => false,
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_objects_and_arrays() {
        let tree = json!({"notes": {"7": "milk"}, "list": ["a", "b"]});
        assert_eq!(lookup(&tree, &["notes", "7"]), Some(&json!("milk")));
        assert_eq!(lookup(&tree, &["list", "1"]), Some(&json!("b")));
        assert_eq!(lookup(&tree, &["notes", "8"]), None);
        assert_eq!(lookup(&tree, &[]), Some(&tree));
    }

    #[test]
    fn store_replaces_and_inserts() {
        let mut tree = json!({"notes": {}});
        assert!(store(&mut tree, &["notes", "7"], json!("milk")));
        assert_eq!(tree, json!({"notes": {"7": "milk"}}));

        assert!(store(&mut tree, &[], json!({"fresh": true})));
        assert_eq!(tree, json!({"fresh": true}));

        // Missing intermediate nodes are not created.
        assert!(!store(&mut tree, &["nowhere", "x"], json!(1)));
    }

    #[test]
    fn normalize_trims_suffix_and_empties() {
        assert_eq!(normalize(&["notes", "7.json"]), vec!["notes", "7"]);
        assert_eq!(normalize(&["notes", "", "7.html"]), vec!["notes", "7"]);
        assert_eq!(normalize(&[""]), Vec::<&str>::new());
        assert_eq!(normalize(&["plain"]), vec!["plain"]);
    }
}
