//! In-process transport for tests and demos.
//!
//! [`MemoryConnector`] hands out connections whose far end is a
//! [`MemoryPeer`] obtained from the paired [`MemoryServer`]. The server can
//! script handshake failures, push frames, inject read errors, break writes,
//! or drop the link entirely.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use futures::Sink;
use socket_resilience_core::{CloseFrame, SocketStream, TransportError};
use tokio::sync::mpsc;

use futures::future::BoxFuture;

use crate::transport::{Connection, Connector, Frame};

type Inbound = Result<Frame, TransportError>;

#[derive(Default)]
struct Shared {
    refusals: Mutex<VecDeque<TransportError>>,
    handshake_delay: Mutex<Option<Duration>>,
    silent: AtomicBool,
    attempts: AtomicUsize,
}

/// Client side: implements [`Connector`].
#[derive(Clone)]
pub struct MemoryConnector {
    shared: Arc<Shared>,
    accepted: mpsc::UnboundedSender<MemoryPeer>,
}

/// Server side: accepts peers and scripts connector behavior.
pub struct MemoryServer {
    shared: Arc<Shared>,
    accepted: mpsc::UnboundedReceiver<MemoryPeer>,
}

impl MemoryConnector {
    /// Creates a connector and the server that observes its connections.
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (MemoryConnector, MemoryServer) {
        let shared = Arc::new(Shared::default());
        let (tx, rx) = mpsc::unbounded_channel();
        (
            MemoryConnector {
                shared: Arc::clone(&shared),
                accepted: tx,
            },
            MemoryServer {
                shared,
                accepted: rx,
            },
        )
    }
}

impl Connector for MemoryConnector {
    fn connect(&self) -> BoxFuture<'static, Result<Connection, TransportError>> {
        let shared = Arc::clone(&self.shared);
        let accepted = self.accepted.clone();

        Box::pin(async move {
            shared.attempts.fetch_add(1, Ordering::SeqCst);

            let delay = *shared
                .handshake_delay
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let refusal = shared
                .refusals
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front();
            if let Some(error) = refusal {
                return Err(error);
            }

            let (to_client, client_source) = SocketStream::<Inbound>::channel();
            let (to_server, from_client) = mpsc::unbounded_channel();
            let write_failure = Arc::new(Mutex::new(None));

            let sink = MemorySink {
                to_server,
                to_client: to_client.downgrade(),
                write_failure: Arc::clone(&write_failure),
                auto_pong: !shared.silent.load(Ordering::SeqCst),
            };
            let peer = MemoryPeer {
                to_client: Some(to_client),
                from_client,
                write_failure,
            };

            accepted
                .send(peer)
                .map_err(|_| TransportError::CannotConnectToHost)?;
            Ok(Connection::new(sink, client_source))
        })
    }
}

impl MemoryServer {
    /// Waits for the next connection the connector opens.
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.accepted.recv().await
    }

    /// Fails the next handshake with `error`. Calls queue up.
    pub fn refuse_next(&self, error: TransportError) {
        self.shared
            .refusals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(error);
    }

    /// Delays every subsequent handshake by `delay`.
    pub fn set_handshake_delay(&self, delay: Duration) {
        *self
            .shared
            .handshake_delay
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(delay);
    }

    /// Stops answering probes with pongs on connections opened from now on.
    pub fn set_silent(&self, silent: bool) {
        self.shared.silent.store(silent, Ordering::SeqCst);
    }

    /// Number of handshakes attempted so far, refused ones included.
    pub fn attempts(&self) -> usize {
        self.shared.attempts.load(Ordering::SeqCst)
    }
}

/// The far end of one in-memory connection.
pub struct MemoryPeer {
    to_client: Option<mpsc::UnboundedSender<Inbound>>,
    from_client: mpsc::UnboundedReceiver<Frame>,
    write_failure: Arc<Mutex<Option<TransportError>>>,
}

impl MemoryPeer {
    /// Delivers a frame to the client.
    pub fn send(&self, frame: Frame) {
        if let Some(tx) = &self.to_client {
            let _ = tx.send(Ok(frame));
        }
    }

    /// Delivers a read error to the client.
    pub fn fail_read(&self, error: TransportError) {
        if let Some(tx) = &self.to_client {
            let _ = tx.send(Err(error));
        }
    }

    /// Sends a close frame and stops delivering.
    pub fn close(&mut self, frame: CloseFrame) {
        self.send(Frame::Close(Some(frame)));
        self.to_client = None;
    }

    /// Ends the client's inbound stream without a close frame.
    pub fn disconnect(&mut self) {
        self.to_client = None;
    }

    /// Makes every further client write fail with `error`.
    pub fn fail_writes(&self, error: TransportError) {
        *self
            .write_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(error);
    }

    /// Receives the next frame written by the client.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.from_client.recv().await
    }

    /// Receives the next data frame, skipping pings and pongs.
    pub async fn recv_data(&mut self) -> Option<Frame> {
        loop {
            match self.from_client.recv().await? {
                Frame::Ping(_) | Frame::Pong(_) => continue,
                frame => return Some(frame),
            }
        }
    }
}

struct MemorySink {
    to_server: mpsc::UnboundedSender<Frame>,
    // Weak so that dropping the peer's sender ends the client's stream.
    to_client: mpsc::WeakUnboundedSender<Inbound>,
    write_failure: Arc<Mutex<Option<TransportError>>>,
    auto_pong: bool,
}

impl MemorySink {
    fn check(&self) -> Result<(), TransportError> {
        match &*self
            .write_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
        {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

impl Sink<Frame> for MemorySink {
    type Error = TransportError;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(self.check())
    }

    fn start_send(self: Pin<&mut Self>, frame: Frame) -> Result<(), Self::Error> {
        self.check()?;
        if let (true, Frame::Ping(payload)) = (self.auto_pong, &frame) {
            if let Some(to_client) = self.to_client.upgrade() {
                let _ = to_client.send(Ok(Frame::Pong(payload.clone())));
            }
        }
        self.to_server
            .send(frame)
            .map_err(|_| TransportError::NetworkConnectionLost)
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(self.check())
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }
}
