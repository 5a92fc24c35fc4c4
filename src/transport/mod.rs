//! Transports that deliver raw frames for one query.

mod eventsource;

pub use eventsource::EventSourceTransport;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::SiftError;

/// Something a transport observed on an open connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The server accepted the connection.
    Opened,
    /// One frame payload, not yet decoded.
    Frame(String),
}

/// Frames of one connection. Dropping the stream closes the connection.
pub type FrameStream = BoxStream<'static, Result<TransportEvent, SiftError>>;

/// Opens one unidirectional event stream per query.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Human-readable endpoint, used in connection error messages.
    fn endpoint(&self) -> &str;

    /// Open a stream for `query`.
    ///
    /// The stream ends with `None` when the server closes it cleanly and
    /// yields `Err` once on a transport failure.
    async fn open(&self, query: &str) -> Result<FrameStream, SiftError>;
}
