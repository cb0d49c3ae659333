//! Property tests for the default failure classifier.
//!
//! Invariants tested:
//! - Any close code classifies without panicking
//! - Only a normal closure ends the session cleanly
//! - A close frame outranks an accompanying error
//! - Close-driven failures carry the peer's frame

use proptest::prelude::*;
use socket_resilience_core::{CloseCode, CloseFrame, SocketError, TransportError};
use socket_resilience_reconnect::{classify, FailureClassification};

fn transport_error() -> impl Strategy<Value = TransportError> {
    prop_oneof![
        Just(TransportError::NotConnectedToInternet),
        Just(TransportError::TimedOut),
        Just(TransportError::NetworkConnectionLost),
        Just(TransportError::Cancelled),
        Just(TransportError::CannotFindHost),
        Just(TransportError::CannotConnectToHost),
        Just(TransportError::BadServerResponse),
        Just(TransportError::SecureConnectionFailed),
        Just(TransportError::ServerCertificateUntrusted),
        Just(TransportError::ServerCertificateHasBadDate),
        Just(TransportError::ServerCertificateHasUnknownRoot),
        "[a-z ]{0,16}".prop_map(TransportError::Other),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// Property: closure is clean exactly for code 1000
    #[test]
    fn only_normal_closure_is_clean(code in any::<u16>()) {
        let frame = CloseFrame::new(CloseCode::from(code));
        let classification = classify(Some(&frame), None);

        match classification {
            FailureClassification::Closed(closed) => {
                prop_assert_eq!(code, 1000);
                prop_assert_eq!(closed, frame);
            }
            FailureClassification::Retryable(Some(SocketError::PeerClosed(carried)))
            | FailureClassification::NonRetryable(Some(SocketError::PeerClosed(carried))) => {
                prop_assert_ne!(code, 1000);
                prop_assert_eq!(carried, frame);
            }
            other => prop_assert!(false, "unexpected classification {:?}", other),
        }
    }

    /// Property: the close frame decides even when an error is present
    #[test]
    fn close_frame_outranks_error(code in any::<u16>(), error in transport_error()) {
        let frame = CloseFrame::new(CloseCode::from(code));
        let error = SocketError::Transport(error);
        prop_assert_eq!(
            classify(Some(&frame), Some(&error)),
            classify(Some(&frame), None)
        );
    }

    /// Property: a peer-closed error classifies like its frame
    #[test]
    fn peer_closed_error_matches_frame(code in any::<u16>()) {
        let frame = CloseFrame::new(CloseCode::from(code));
        prop_assert_eq!(
            classify(None, Some(&SocketError::PeerClosed(frame.clone()))),
            classify(Some(&frame), None)
        );
    }

    /// Property: transport errors are never a clean close and keep their cause
    #[test]
    fn transport_errors_keep_their_cause(error in transport_error()) {
        let error = SocketError::Transport(error);
        match classify(None, Some(&error)) {
            FailureClassification::Retryable(Some(carried))
            | FailureClassification::NonRetryable(Some(carried)) => {
                prop_assert_eq!(carried, error);
            }
            other => prop_assert!(false, "unexpected classification {:?}", other),
        }
    }
}
