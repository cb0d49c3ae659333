//! Failure classification for reconnection decisions.
//!
//! When an engine terminates, the supervisor asks a [`TerminationClassifier`]
//! whether the cause is worth another attempt. [`classify`] holds the default
//! table: the close code decides if one is present, then the error, and an
//! unexplained termination is retried.

use std::sync::Arc;

use socket_resilience_core::{CloseCode, CloseFrame, SocketError, TransportError};

/// How a terminated connection should be treated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureClassification {
    /// Worth another attempt after backoff.
    Retryable(Option<SocketError>),
    /// Permanent; the supervisor fails with the carried error.
    NonRetryable(Option<SocketError>),
    /// The session ended cleanly.
    Closed(CloseFrame),
}

impl FailureClassification {
    /// Returns `true` for [`FailureClassification::Retryable`].
    pub fn is_retryable(&self) -> bool {
        matches!(self, FailureClassification::Retryable(_))
    }
}

/// Classifies the cause of a terminated connection.
///
/// # Example
///
/// ```rust
/// use socket_resilience_core::{CloseCode, CloseFrame, SocketError, TransportError};
/// use socket_resilience_reconnect::{classify, FailureClassification};
///
/// let closed = classify(Some(&CloseFrame::new(CloseCode::NormalClosure)), None);
/// assert_eq!(closed, FailureClassification::Closed(CloseFrame::normal()));
///
/// let lost = SocketError::Transport(TransportError::NetworkConnectionLost);
/// assert!(classify(None, Some(&lost)).is_retryable());
///
/// let dns = SocketError::Transport(TransportError::CannotFindHost);
/// assert!(!classify(None, Some(&dns)).is_retryable());
/// ```
pub fn classify(close: Option<&CloseFrame>, error: Option<&SocketError>) -> FailureClassification {
    if let Some(frame) = close {
        return classify_close(frame);
    }

    match error {
        Some(SocketError::PeerClosed(frame)) => classify_close(frame),
        // A crashed or unobservable engine would fail the same way again.
        Some(SocketError::EngineStopped) => {
            FailureClassification::NonRetryable(Some(SocketError::EngineStopped))
        }
        Some(error) => match error.transport() {
            Some(transport) if !is_retryable_transport(transport) => {
                FailureClassification::NonRetryable(Some(error.clone()))
            }
            _ => FailureClassification::Retryable(Some(error.clone())),
        },
        None => FailureClassification::Retryable(None),
    }
}

fn classify_close(frame: &CloseFrame) -> FailureClassification {
    match frame.code {
        CloseCode::NormalClosure => FailureClassification::Closed(frame.clone()),
        CloseCode::ProtocolError
        | CloseCode::UnsupportedData
        | CloseCode::PolicyViolation
        | CloseCode::MessageTooBig
        | CloseCode::TlsHandshakeFailure
        | CloseCode::InvalidFramePayloadData
        | CloseCode::Invalid
        | CloseCode::MandatoryExtensionMissing => {
            FailureClassification::NonRetryable(Some(SocketError::PeerClosed(frame.clone())))
        }
        // GoingAway, AbnormalClosure, InternalServerError, NoStatusReceived
        // and unknown codes.
        _ => FailureClassification::Retryable(Some(SocketError::PeerClosed(frame.clone()))),
    }
}

fn is_retryable_transport(error: &TransportError) -> bool {
    !matches!(
        error,
        TransportError::CannotFindHost
            | TransportError::CannotConnectToHost
            | TransportError::BadServerResponse
            | TransportError::SecureConnectionFailed
            | TransportError::ServerCertificateUntrusted
            | TransportError::ServerCertificateHasBadDate
            | TransportError::ServerCertificateHasUnknownRoot
    )
}

/// Decides whether a terminated connection should be retried.
pub trait TerminationClassifier: Send + Sync + 'static {
    /// Classifies a termination from its close frame and/or error.
    fn classify(
        &self,
        close: Option<&CloseFrame>,
        error: Option<&SocketError>,
    ) -> FailureClassification;
}

/// Classifier applying the default table of [`classify`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultClassifier;

impl TerminationClassifier for DefaultClassifier {
    fn classify(
        &self,
        close: Option<&CloseFrame>,
        error: Option<&SocketError>,
    ) -> FailureClassification {
        classify(close, error)
    }
}

/// A termination classifier backed by a closure.
///
/// # Example
///
/// ```rust
/// use socket_resilience_core::{CloseFrame, SocketError, TransportError};
/// use socket_resilience_reconnect::{classify, FailureClassification, FnClassifier, TerminationClassifier};
///
/// // Treat a refused connection as transient on a flaky local network.
/// let classifier = FnClassifier::new(|close: Option<&CloseFrame>, error: Option<&SocketError>| match error {
///     Some(SocketError::Transport(TransportError::CannotConnectToHost)) => {
///         FailureClassification::Retryable(error.cloned())
///     }
///     _ => classify(close, error),
/// });
///
/// let refused = SocketError::Transport(TransportError::CannotConnectToHost);
/// assert!(classifier.classify(None, Some(&refused)).is_retryable());
/// ```
#[derive(Clone)]
pub struct FnClassifier<F> {
    f: Arc<F>,
}

impl<F> FnClassifier<F> {
    /// Creates a new `FnClassifier` from the given closure.
    pub fn new(f: F) -> Self {
        Self { f: Arc::new(f) }
    }
}

impl<F> TerminationClassifier for FnClassifier<F>
where
    F: Fn(Option<&CloseFrame>, Option<&SocketError>) -> FailureClassification
        + Send
        + Sync
        + 'static,
{
    fn classify(
        &self,
        close: Option<&CloseFrame>,
        error: Option<&SocketError>,
    ) -> FailureClassification {
        (self.f)(close, error)
    }
}

impl<F> std::fmt::Debug for FnClassifier<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnClassifier")
            .field("f", &"<closure>")
            .finish()
    }
}
