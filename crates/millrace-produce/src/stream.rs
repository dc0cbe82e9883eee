//! Chunk streams: the lazy output of a producer.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use millrace_core::{EscapeResponse, Payload};

/// One item of producer output.
#[derive(Debug)]
pub enum Chunk {
    /// Ordinary response data.
    Data(Payload),
    /// A prebuilt response surfacing through the stream. As the first item
    /// it takes over the response headers; later it degrades to its
    /// payload.
    Escape(Box<EscapeResponse>),
}

impl Chunk {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Data(Payload::Text(text.into()))
    }

    pub fn escape(escape: EscapeResponse) -> Self {
        Self::Escape(Box::new(escape))
    }
}

/// Why a stream stopped early.
#[derive(Debug)]
pub enum Interrupt {
    /// An escape response raised instead of yielded; its payload ends the
    /// response.
    Escape(Box<EscapeResponse>),
    /// The producer failed outright.
    Failure(anyhow::Error),
}

impl Interrupt {
    pub fn escape(escape: EscapeResponse) -> Self {
        Self::Escape(Box::new(escape))
    }

    pub fn failure(err: impl Into<anyhow::Error>) -> Self {
        Self::Failure(err.into())
    }
}

/// A pull-based stream of chunks. An `Err` item is terminal.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Chunk, Interrupt>> + Send>>;

struct ItemStream {
    items: std::vec::IntoIter<Result<Chunk, Interrupt>>,
}

impl Stream for ItemStream {
    type Item = Result<Chunk, Interrupt>;

    fn poll_next(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Poll::Ready(self.get_mut().items.next())
    }
}

/// A stream yielding the given items in order.
pub fn from_items(items: Vec<Result<Chunk, Interrupt>>) -> ChunkStream {
    Box::pin(ItemStream {
        items: items.into_iter(),
    })
}

pub fn once(item: Result<Chunk, Interrupt>) -> ChunkStream {
    from_items(vec![item])
}

/// A single text chunk.
pub fn text(text: impl Into<String>) -> ChunkStream {
    once(Ok(Chunk::text(text)))
}

/// A single escape response.
pub fn escape(escape: EscapeResponse) -> ChunkStream {
    once(Ok(Chunk::escape(escape)))
}

/// A stream that fails before producing anything.
pub fn failure(err: impl Into<anyhow::Error>) -> ChunkStream {
    once(Err(Interrupt::failure(err)))
}

pub fn empty() -> ChunkStream {
    from_items(Vec::new())
}

/// Box an arbitrary stream as a [`ChunkStream`].
pub fn boxed(
    stream: impl Stream<Item = Result<Chunk, Interrupt>> + Send + 'static,
) -> ChunkStream {
    Box::pin(stream)
}
