//! Error types shared by the engine and the supervisor.
//!
//! Three layers of failure exist:
//!
//! - [`FrameError`]: a single inbound frame could not be interpreted. Reported
//!   inline on the message stream; the connection stays up.
//! - [`TransportError`]: the network or security layer failed. Always terminal
//!   for the current physical connection.
//! - [`SocketError`]: the reason a session (or one attempt of it) ended, as
//!   carried by [`ConnectionState::Failed`](crate::ConnectionState::Failed).

use std::io;

use crate::state::CloseFrame;

/// Failures reported by the underlying transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The device has no network connectivity.
    #[error("not connected to the internet")]
    NotConnectedToInternet,
    /// An operation did not complete in time.
    #[error("the operation timed out")]
    TimedOut,
    /// An established connection was lost.
    #[error("the network connection was lost")]
    NetworkConnectionLost,
    /// The operation was cancelled locally.
    #[error("the operation was cancelled")]
    Cancelled,
    /// Name resolution failed.
    #[error("cannot find host")]
    CannotFindHost,
    /// The host refused or could not accept the connection.
    #[error("cannot connect to host")]
    CannotConnectToHost,
    /// The server answered the handshake with something unusable.
    #[error("bad server response")]
    BadServerResponse,
    /// TLS negotiation failed.
    #[error("secure connection failed")]
    SecureConnectionFailed,
    /// The server certificate chain is not trusted.
    #[error("server certificate untrusted")]
    ServerCertificateUntrusted,
    /// The server certificate is expired or not yet valid.
    #[error("server certificate has bad date")]
    ServerCertificateHasBadDate,
    /// The server certificate chains to an unknown root.
    #[error("server certificate has unknown root")]
    ServerCertificateHasUnknownRoot,
    /// Anything else, described by the transport.
    #[error("transport error: {0}")]
    Other(String),
}

impl From<io::Error> for TransportError {
    fn from(error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TransportError::TimedOut,
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof => TransportError::NetworkConnectionLost,
            io::ErrorKind::ConnectionRefused | io::ErrorKind::AddrNotAvailable => {
                TransportError::CannotConnectToHost
            }
            io::ErrorKind::NotConnected => TransportError::NotConnectedToInternet,
            io::ErrorKind::Interrupted => TransportError::Cancelled,
            _ => TransportError::Other(error.to_string()),
        }
    }
}

/// A frame that reached the consumer as an error instead of a payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The frame had a shape the engine does not deliver.
    #[error("frame corrupted: unsupported frame shape")]
    Corrupted,
    /// Reading the frame failed.
    #[error("frame read failed: {0}")]
    Failed(TransportError),
}

/// Why a session or connection attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SocketError {
    /// The transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The peer closed the connection with a non-normal code.
    #[error("peer closed the connection: {0}")]
    PeerClosed(CloseFrame),

    /// A frame was sent while no connection was established.
    #[error("socket is not connected")]
    NotConnected,

    /// No frame arrived within the pong timeout after a heartbeat probe.
    #[error("heartbeat timed out waiting for the peer")]
    HeartbeatTimeout,

    /// An engine stopped without reporting how, or could not be observed.
    #[error("engine stopped without a terminal state")]
    EngineStopped,

    /// The reconnection budget was exhausted.
    #[error("exceeded maximum reconnection attempts ({attempts})")]
    ExceededAttempts {
        /// Number of failed attempts made.
        attempts: u32,
    },
}

impl SocketError {
    /// Returns the transport error behind this failure, if there is one.
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            SocketError::Transport(error) => Some(error),
            _ => None,
        }
    }

    /// Returns the close frame behind this failure, if the peer closed.
    pub fn close_frame(&self) -> Option<&CloseFrame> {
        match self {
            SocketError::PeerClosed(frame) => Some(frame),
            _ => None,
        }
    }
}
