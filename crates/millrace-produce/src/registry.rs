//! The content registry and its dispatch rules.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock};

use millrace_core::RequestState;
use tracing::debug;

use crate::stream::{self, ChunkStream};
use crate::value::AppValue;

/// The capability "produce a lazy sequence of chunks given (value, state)".
///
/// Implemented for free by any matching `Fn`, so a serializer can be a
/// plain function, a closure, or a stateful type.
pub trait Producer: Send + Sync {
    fn produce(&self, value: &dyn AppValue, state: &RequestState) -> ChunkStream;
}

impl<F> Producer for F
where
    F: Fn(&dyn AppValue, &RequestState) -> ChunkStream + Send + Sync,
{
    fn produce(&self, value: &dyn AppValue, state: &RequestState) -> ChunkStream {
        self(value, state)
    }
}

/// Adapts a producer written against a concrete value type to the dynamic
/// [`Producer`] contract.
struct Typed<T, F> {
    f: F,
    _value: PhantomData<fn(&T)>,
}

impl<T, F> Producer for Typed<T, F>
where
    T: Any,
    F: Fn(&T, &RequestState) -> ChunkStream + Send + Sync,
{
    fn produce(&self, value: &dyn AppValue, state: &RequestState) -> ChunkStream {
        match value.as_any().downcast_ref::<T>() {
            Some(typed) => (self.f)(typed, state),
            // Unreachable through the registry, which keys this producer by
            // the same TypeId it downcasts with.
            None => stream::failure(anyhow::anyhow!("producer registered for a different type")),
        }
    }
}

/// A value carrying its own producer.
///
/// Dispatch consults it after the accept scan finds nothing: the value is
/// handed to its embedded producer, which receives the [`SelfProducing`]
/// wrapper itself as the value argument. This is how stream-like resources
/// plug in without a registry entry.
pub struct SelfProducing {
    label: String,
    producer: Arc<dyn Producer>,
}

impl SelfProducing {
    pub fn new(label: impl Into<String>, producer: impl Producer + 'static) -> Self {
        Self {
            label: label.into(),
            producer: Arc::new(producer),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Display for SelfProducing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

struct Registered {
    producer: Arc<dyn Producer>,
    type_name: &'static str,
}

/// Maps (mime type, exact runtime type) to a producer.
///
/// Registries are plain constructed values: build one, register what you
/// need, and hand it to the pipeline. Registration is last-writer-wins for
/// the same (mime, type) pair.
#[derive(Default)]
pub struct Registry {
    // mime -> value type -> producer
    producers: RwLock<HashMap<String, HashMap<TypeId, Registered>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the built-ins: JSON values under
    /// `application/json`, static content under `*/*`.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register::<serde_json::Value, _>("application/json", crate::json::produce_json);
        registry.register::<crate::content::StaticContent, _>("*/*", crate::content::produce_static);
        registry
    }

    /// Register `produce` for values of exactly `T` under `mime`.
    pub fn register<T, F>(&self, mime: impl Into<String>, produce: F)
    where
        T: Any,
        F: Fn(&T, &RequestState) -> ChunkStream + Send + Sync + 'static,
    {
        self.register_producer::<T>(
            mime,
            Arc::new(Typed {
                f: produce,
                _value: PhantomData,
            }),
        );
    }

    /// Register an already-built producer for values of exactly `T`.
    pub fn register_producer<T: Any>(&self, mime: impl Into<String>, producer: Arc<dyn Producer>) {
        let mut producers = self.producers.write().expect("producers lock");
        producers.entry(mime.into()).or_default().insert(
            TypeId::of::<T>(),
            Registered {
                producer,
                type_name: std::any::type_name::<T>(),
            },
        );
    }

    /// Dispatch `value` against the request's accept list.
    ///
    /// Scans `state.accept` in order for an exact (mime, type) entry; a
    /// mime with no entry for this type does not stop the scan. When the
    /// scan misses entirely, a [`SelfProducing`] value produces itself;
    /// anything else becomes a single textual fallback chunk.
    pub fn produce(&self, value: &dyn AppValue, state: &RequestState) -> ChunkStream {
        let type_id = value.as_any().type_id();
        for mime in &state.accept {
            let hit = {
                let producers = self.producers.read().expect("producers lock");
                producers
                    .get(mime.as_str())
                    .and_then(|by_type| by_type.get(&type_id))
                    .map(|registered| (registered.producer.clone(), registered.type_name))
            };
            if let Some((producer, type_name)) = hit {
                debug!(mime = %mime, value_type = type_name, "producer matched");
                return producer.produce(value, state);
            }
        }
        if let Some(self_producing) = value.as_any().downcast_ref::<SelfProducing>() {
            debug!(label = self_producing.label(), "value produces itself");
            return self_producing.producer.produce(value, state);
        }
        debug!("no producer matched; using textual fallback");
        stream::text(value.fallback_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{Chunk, Interrupt};
    use futures_core::Stream;
    use millrace_core::Payload;

    async fn collect(mut stream: ChunkStream) -> Vec<Result<Chunk, Interrupt>> {
        let mut items = Vec::new();
        while let Some(item) = std::future::poll_fn(|cx| stream.as_mut().poll_next(cx)).await {
            items.push(item);
        }
        items
    }

    async fn collect_text(stream: ChunkStream) -> Vec<String> {
        collect(stream)
            .await
            .into_iter()
            .map(|item| match item {
                Ok(Chunk::Data(Payload::Text(text))) => text,
                other => panic!("expected text chunk, got {other:?}"),
            })
            .collect()
    }

    struct Widget {
        id: u32,
    }

    impl fmt::Display for Widget {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "widget-{}", self.id)
        }
    }

    fn widget_producer(widget: &Widget, _state: &RequestState) -> ChunkStream {
        stream::text(format!("CUSTOM:{}", widget.id))
    }

    fn state_accepting(mimes: &[&str]) -> RequestState {
        let mut state = RequestState::new("GET", "/w");
        state.accept = mimes.iter().map(|m| m.to_string()).collect();
        state
    }

    #[tokio::test]
    async fn dispatch_matches_on_mime_and_exact_type() {
        let registry = Registry::new();
        registry.register::<Widget, _>("text/custom", widget_producer);

        let state = state_accepting(&["text/custom", "application/json"]);
        let chunks = collect_text(registry.produce(&Widget { id: 7 }, &state)).await;
        assert_eq!(chunks, vec!["CUSTOM:7".to_string()]);
    }

    #[tokio::test]
    async fn scan_continues_past_mimes_with_no_entry() {
        let registry = Registry::new();
        registry.register::<Widget, _>("application/json", widget_producer);

        let state = state_accepting(&["text/html", "application/json"]);
        let chunks = collect_text(registry.produce(&Widget { id: 3 }, &state)).await;
        assert_eq!(chunks, vec!["CUSTOM:3".to_string()]);
    }

    #[tokio::test]
    async fn unmatched_values_fall_back_to_display() {
        let registry = Registry::new();
        let state = state_accepting(&["text/custom", "application/xml"]);
        let chunks = collect_text(registry.produce(&Widget { id: 9 }, &state)).await;
        assert_eq!(chunks, vec!["widget-9".to_string()]);
    }

    #[tokio::test]
    async fn reregistration_replaces() {
        fn second(widget: &Widget, _state: &RequestState) -> ChunkStream {
            stream::text(format!("SECOND:{}", widget.id))
        }

        let registry = Registry::new();
        registry.register::<Widget, _>("*/*", widget_producer);
        registry.register::<Widget, _>("*/*", second);

        let state = state_accepting(&["*/*"]);
        let chunks = collect_text(registry.produce(&Widget { id: 1 }, &state)).await;
        assert_eq!(chunks, vec!["SECOND:1".to_string()]);
    }

    #[tokio::test]
    async fn self_producing_values_receive_themselves() {
        fn echo(value: &dyn AppValue, _state: &RequestState) -> ChunkStream {
            match value.as_any().downcast_ref::<SelfProducing>() {
                Some(sp) => stream::text(format!("SELF:{}", sp.label())),
                None => stream::failure(anyhow::anyhow!("not self-producing")),
            }
        }

        let registry = Registry::new();
        let value = SelfProducing::new("ticker", echo);
        let state = state_accepting(&["text/plain"]);
        let chunks = collect_text(registry.produce(&value, &state)).await;
        assert_eq!(chunks, vec!["SELF:ticker".to_string()]);
    }

    #[tokio::test]
    async fn registered_entries_win_over_self_production() {
        fn never(value: &dyn AppValue, _state: &RequestState) -> ChunkStream {
            let _ = value;
            stream::failure(anyhow::anyhow!("should not run"))
        }

        fn direct(_sp: &SelfProducing, _state: &RequestState) -> ChunkStream {
            stream::text("REGISTERED")
        }

        let registry = Registry::new();
        registry.register::<SelfProducing, _>("*/*", direct);

        let value = SelfProducing::new("x", never);
        let state = state_accepting(&["*/*"]);
        let chunks = collect_text(registry.produce(&value, &state)).await;
        assert_eq!(chunks, vec!["REGISTERED".to_string()]);
    }

    #[tokio::test]
    async fn default_registry_serializes_json_values() {
        let registry = Registry::with_defaults();
        let state = state_accepting(&["application/json", "*/*"]);
        let value = serde_json::json!({"message": "hello"});
        let chunks = collect_text(registry.produce(&value, &state)).await;
        assert_eq!(chunks, vec!["{\"message\":\"hello\"}".to_string()]);
    }
}
