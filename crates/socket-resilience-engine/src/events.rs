use socket_resilience_core::events::ResilienceEvent;
use socket_resilience_core::{ConnectionState, TransportError};
use std::time::Instant;

/// Events emitted by a [`SocketEngine`](crate::SocketEngine).
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// The engine moved from one state to another.
    StateTransition {
        socket_name: String,
        timestamp: Instant,
        from: Option<ConnectionState>,
        to: ConnectionState,
    },
    /// A heartbeat probe could not be written.
    HeartbeatFailed {
        socket_name: String,
        timestamp: Instant,
        error: TransportError,
    },
    /// No frame arrived within the pong timeout.
    HeartbeatTimedOut {
        socket_name: String,
        timestamp: Instant,
    },
    /// An inbound frame was reported as corrupted.
    FrameCorrupted {
        socket_name: String,
        timestamp: Instant,
    },
}

impl ResilienceEvent for EngineEvent {
    fn event_type(&self) -> &'static str {
        match self {
            EngineEvent::StateTransition { .. } => "state_transition",
            EngineEvent::HeartbeatFailed { .. } => "heartbeat_failed",
            EngineEvent::HeartbeatTimedOut { .. } => "heartbeat_timed_out",
            EngineEvent::FrameCorrupted { .. } => "frame_corrupted",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            EngineEvent::StateTransition { timestamp, .. }
            | EngineEvent::HeartbeatFailed { timestamp, .. }
            | EngineEvent::HeartbeatTimedOut { timestamp, .. }
            | EngineEvent::FrameCorrupted { timestamp, .. } => *timestamp,
        }
    }

    fn socket_name(&self) -> &str {
        match self {
            EngineEvent::StateTransition { socket_name, .. }
            | EngineEvent::HeartbeatFailed { socket_name, .. }
            | EngineEvent::HeartbeatTimedOut { socket_name, .. }
            | EngineEvent::FrameCorrupted { socket_name, .. } => socket_name,
        }
    }
}
