//! The socket capability shared by the engine and the supervisor.

use std::pin::Pin;
use std::sync::Mutex;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::Stream;
use tokio::sync::mpsc;

use crate::error::{FrameError, SocketError};
use crate::state::ConnectionState;

/// One inbound message: a payload, or the reason a frame could not be read.
pub type InboundMessage = Result<Bytes, FrameError>;

/// Ordered stream of connection states.
pub type StateStream = SocketStream<ConnectionState>;

/// Ordered stream of inbound messages.
pub type MessageStream = SocketStream<InboundMessage>;

/// A message-oriented duplex connection with observable state.
///
/// Lifecycle problems are never returned from `connect` or `close`; they are
/// reported through [`state`](Socket::state). `send` reports only whether
/// the given frame was written.
///
/// Both streams are single-consumer: the first call hands the stream out and
/// later calls return `None`.
pub trait Socket: Send + Sync + 'static {
    /// Starts connecting. Completion is observed on the state stream.
    fn connect(&self) -> BoxFuture<'_, ()>;

    /// Sends one message frame to the peer.
    ///
    /// Without a live connection (before `connect`, during the handshake, or
    /// after a terminal state) this returns [`SocketError::NotConnected`]
    /// immediately and emits nothing on the state stream.
    fn send(&self, payload: Bytes) -> BoxFuture<'_, Result<(), SocketError>>;

    /// Shuts the socket down gracefully. Safe to call more than once.
    fn close(&self) -> BoxFuture<'_, ()>;

    /// Takes the state stream.
    fn state(&self) -> Option<StateStream>;

    /// Takes the inbound message stream.
    fn incoming(&self) -> Option<MessageStream>;
}

impl<S: Socket + ?Sized> Socket for Box<S> {
    fn connect(&self) -> BoxFuture<'_, ()> {
        (**self).connect()
    }

    fn send(&self, payload: Bytes) -> BoxFuture<'_, Result<(), SocketError>> {
        (**self).send(payload)
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        (**self).close()
    }

    fn state(&self) -> Option<StateStream> {
        (**self).state()
    }

    fn incoming(&self) -> Option<MessageStream> {
        (**self).incoming()
    }
}

/// Unbounded, push-based stream backing [`StateStream`] and [`MessageStream`].
///
/// The stream ends once every sender has been dropped and the buffer drained.
#[derive(Debug)]
pub struct SocketStream<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> SocketStream<T> {
    /// Creates a connected sender/stream pair.
    pub fn channel() -> (mpsc::UnboundedSender<T>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }

    /// Receives the next item, or `None` once the stream has ended.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Returns the next item if one is already buffered.
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }
}

impl<T> Stream for SocketStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.rx.poll_recv(cx)
    }
}

/// Holds a stream until its single consumer takes it.
#[derive(Debug)]
pub struct StreamSlot<T> {
    stream: Mutex<Option<SocketStream<T>>>,
}

impl<T> StreamSlot<T> {
    /// Creates a slot filled with `stream`.
    pub fn new(stream: SocketStream<T>) -> Self {
        Self {
            stream: Mutex::new(Some(stream)),
        }
    }

    /// Takes the stream, or `None` if it was already taken.
    pub fn take(&self) -> Option<SocketStream<T>> {
        self.stream.lock().ok()?.take()
    }
}
