//! Wire-level events and frames exchanged with a transport.

use bytes::Bytes;

use crate::header::HeaderList;

/// An event arriving from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// A chunk of request body. `more_body` signals whether further chunks
    /// follow for this request.
    Request { body: Bytes, more_body: bool },
    /// The client went away.
    Disconnect,
    /// Lifecycle: the host is starting up.
    Startup,
    /// Lifecycle: the host is shutting down.
    Shutdown,
}

/// A frame emitted toward the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// Response status and headers. Sent exactly once per HTTP exchange,
    /// before any body frame.
    ResponseStart { status: u16, headers: HeaderList },
    /// A chunk of response body. The final frame of an exchange carries
    /// `more_body == false`; nothing follows it.
    ResponseBody { body: Bytes, more_body: bool },
    /// Lifecycle acknowledgement for [`InboundEvent::Startup`].
    StartupComplete,
    /// Lifecycle acknowledgement for [`InboundEvent::Shutdown`].
    ShutdownComplete,
}

impl OutboundFrame {
    pub fn start(status: u16, headers: HeaderList) -> Self {
        Self::ResponseStart { status, headers }
    }

    /// A body frame with more to come.
    pub fn body(body: impl Into<Bytes>) -> Self {
        Self::ResponseBody {
            body: body.into(),
            more_body: true,
        }
    }

    /// The closing body frame of an exchange.
    pub fn final_body(body: impl Into<Bytes>) -> Self {
        Self::ResponseBody {
            body: body.into(),
            more_body: false,
        }
    }

    /// Status code, when this is a start frame.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ResponseStart { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_constructors_set_more_body() {
        assert_eq!(
            OutboundFrame::body("abc"),
            OutboundFrame::ResponseBody {
                body: Bytes::from_static(b"abc"),
                more_body: true,
            }
        );
        assert_eq!(
            OutboundFrame::final_body("abc"),
            OutboundFrame::ResponseBody {
                body: Bytes::from_static(b"abc"),
                more_body: false,
            }
        );
    }

    #[test]
    fn status_only_on_start_frames() {
        let start = OutboundFrame::start(204, HeaderList::new());
        assert_eq!(start.status(), Some(204));
        assert_eq!(OutboundFrame::final_body("").status(), None);
    }
}
