//! Connection state and close codes.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;

use crate::error::SocketError;

/// Close status codes as defined by RFC 6455, plus the `Invalid` sentinel
/// some platforms report when no code was negotiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloseCode {
    /// No valid code was received (0).
    Invalid,
    /// 1000
    NormalClosure,
    /// 1001
    GoingAway,
    /// 1002
    ProtocolError,
    /// 1003
    UnsupportedData,
    /// 1005
    NoStatusReceived,
    /// 1006
    AbnormalClosure,
    /// 1007
    InvalidFramePayloadData,
    /// 1008
    PolicyViolation,
    /// 1009
    MessageTooBig,
    /// 1010
    MandatoryExtensionMissing,
    /// 1011
    InternalServerError,
    /// 1015
    TlsHandshakeFailure,
    /// Any code not named above.
    Other(u16),
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> Self {
        match code {
            0 => CloseCode::Invalid,
            1000 => CloseCode::NormalClosure,
            1001 => CloseCode::GoingAway,
            1002 => CloseCode::ProtocolError,
            1003 => CloseCode::UnsupportedData,
            1005 => CloseCode::NoStatusReceived,
            1006 => CloseCode::AbnormalClosure,
            1007 => CloseCode::InvalidFramePayloadData,
            1008 => CloseCode::PolicyViolation,
            1009 => CloseCode::MessageTooBig,
            1010 => CloseCode::MandatoryExtensionMissing,
            1011 => CloseCode::InternalServerError,
            1015 => CloseCode::TlsHandshakeFailure,
            other => CloseCode::Other(other),
        }
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        match code {
            CloseCode::Invalid => 0,
            CloseCode::NormalClosure => 1000,
            CloseCode::GoingAway => 1001,
            CloseCode::ProtocolError => 1002,
            CloseCode::UnsupportedData => 1003,
            CloseCode::NoStatusReceived => 1005,
            CloseCode::AbnormalClosure => 1006,
            CloseCode::InvalidFramePayloadData => 1007,
            CloseCode::PolicyViolation => 1008,
            CloseCode::MessageTooBig => 1009,
            CloseCode::MandatoryExtensionMissing => 1010,
            CloseCode::InternalServerError => 1011,
            CloseCode::TlsHandshakeFailure => 1015,
            CloseCode::Other(code) => code,
        }
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self, u16::from(*self))
    }
}

/// A close code together with the optional reason sent alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFrame {
    /// The close status code.
    pub code: CloseCode,
    /// Raw reason bytes, if the peer sent any.
    pub reason: Option<Bytes>,
}

impl CloseFrame {
    /// Creates a close frame with no reason.
    pub fn new(code: CloseCode) -> Self {
        Self { code, reason: None }
    }

    /// Creates a close frame carrying a reason.
    pub fn with_reason(code: CloseCode, reason: impl Into<Bytes>) -> Self {
        Self {
            code,
            reason: Some(reason.into()),
        }
    }

    /// A `NormalClosure` frame without reason.
    pub fn normal() -> Self {
        Self::new(CloseCode::NormalClosure)
    }
}

impl fmt::Display for CloseFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            Some(reason) if !reason.is_empty() => {
                write!(f, "{}: {}", self.code, String::from_utf8_lossy(reason))
            }
            _ => write!(f, "{}", self.code),
        }
    }
}

/// The observable state of a socket session.
///
/// Exactly one state is current at a time. `Closed` and `Failed` are terminal:
/// once either has been emitted, the emitting component produces nothing more.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// A connection attempt is in progress.
    Connecting,

    /// The handshake completed and the heartbeat is running.
    Connected,

    /// The last attempt ended; the supervisor retries after the given delay.
    Reconnecting {
        /// Delay before the next attempt starts.
        next_attempt_in: Duration,
    },

    /// The session ended without error.
    Closed(CloseFrame),

    /// The session ended with an unrecoverable error.
    Failed(SocketError),
}

impl ConnectionState {
    /// Returns `true` for `Closed` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Closed(_) | ConnectionState::Failed(_))
    }

    /// Returns `true` only for `Connected`.
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// Short label used for logs and metric labels.
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting { .. } => "reconnecting",
            ConnectionState::Closed(_) => "closed",
            ConnectionState::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Reconnecting { next_attempt_in } => {
                write!(f, "reconnecting in {:?}", next_attempt_in)
            }
            ConnectionState::Closed(frame) => write!(f, "closed ({})", frame),
            ConnectionState::Failed(error) => write!(f, "failed ({})", error),
            other => f.write_str(other.label()),
        }
    }
}
