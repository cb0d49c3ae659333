//! The seam between the engine and a concrete wire transport.
//!
//! A [`Connector`] performs one handshake and yields a [`Connection`]: a sink
//! for outbound [`Frame`]s and a stream of inbound ones. The engine never
//! reuses a connection; every attempt asks the connector for a new one.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::{Sink, Stream};
use socket_resilience_core::{CloseFrame, TransportError};

/// A single frame on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text payload.
    Text(String),
    /// Binary payload.
    Binary(Bytes),
    /// Liveness probe.
    Ping(Bytes),
    /// Answer to a probe.
    Pong(Bytes),
    /// Close handshake, with the code and reason if the peer sent one.
    Close(Option<CloseFrame>),
    /// A frame the transport could read but the engine does not deliver.
    Unsupported,
}

/// Outbound half of a connection.
pub type FrameSink = Pin<Box<dyn Sink<Frame, Error = TransportError> + Send>>;

/// Inbound half of a connection.
pub type FrameSource = Pin<Box<dyn Stream<Item = Result<Frame, TransportError>> + Send>>;

/// An established physical connection.
pub struct Connection {
    /// Where outbound frames are written.
    pub sink: FrameSink,
    /// Where inbound frames are read.
    pub source: FrameSource,
}

impl Connection {
    /// Boxes a sink and a stream into a connection.
    pub fn new<Si, St>(sink: Si, source: St) -> Self
    where
        Si: Sink<Frame, Error = TransportError> + Send + 'static,
        St: Stream<Item = Result<Frame, TransportError>> + Send + 'static,
    {
        Self {
            sink: Box::pin(sink),
            source: Box::pin(source),
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}

/// Opens physical connections.
///
/// Implemented for any `Fn() -> impl Future<Output = Result<Connection, TransportError>>`.
pub trait Connector: Send + Sync + 'static {
    /// Performs one handshake.
    fn connect(&self) -> BoxFuture<'static, Result<Connection, TransportError>>;
}

impl<F, Fut> Connector for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Connection, TransportError>> + Send + 'static,
{
    fn connect(&self) -> BoxFuture<'static, Result<Connection, TransportError>> {
        Box::pin(self())
    }
}
