//! Core protocol types for the millrace request pipeline.
//!
//! Everything the pipeline exchanges with the outside world is expressed
//! through two small vocabularies: [`InboundEvent`]s arriving from a
//! transport and [`OutboundFrame`]s emitted back to it. A concrete server
//! binding implements [`FrameReceiver`] and [`FrameSender`]; the pipeline
//! never sees sockets, parsers, or protocol details.
//!
//! # Frame Protocol
//!
//! One HTTP exchange produces exactly one [`OutboundFrame::ResponseStart`]
//! followed by one or more [`OutboundFrame::ResponseBody`] frames, of which
//! only the last carries `more_body == false`. Lifecycle acknowledgements
//! ([`OutboundFrame::StartupComplete`], [`OutboundFrame::ShutdownComplete`])
//! sit outside that cycle.
//!
//! # Escape Responses
//!
//! An [`EscapeResponse`] is a prebuilt header frame plus payload that any
//! layer can return, or surface as an interrupt, to take over the response.
//! When it carries a [`Continuation`] the escape also claims every frame
//! after its payload, including the final one.

mod config;
mod error;
mod escape;
mod frame;
mod header;
pub mod mem;
mod state;
mod transport;

pub use config::PipelineConfig;
pub use error::{error_body, DecodeError, DecodeResult};
pub use escape::{Continuation, EscapeResponse, Payload, StartFrame};
pub use frame::{InboundEvent, OutboundFrame};
pub use header::{Header, HeaderList};
pub use state::{DecodedBody, FormValue, HttpScope, PartValue, RequestState, Scope};
pub use transport::{FrameReceiver, FrameSender, TransportClosed, TransportResult};
