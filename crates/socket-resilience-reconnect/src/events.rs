use socket_resilience_core::events::ResilienceEvent;
use socket_resilience_core::ConnectionState;
use std::time::{Duration, Instant};

/// Events emitted by a [`ReconnectSupervisor`](crate::ReconnectSupervisor).
#[derive(Debug, Clone)]
pub enum ReconnectEvent {
    /// The supervisor's public state changed.
    StateTransition {
        socket_name: String,
        timestamp: Instant,
        from: Option<ConnectionState>,
        to: ConnectionState,
    },
    /// A retryable failure was observed and another attempt is scheduled.
    ReconnectScheduled {
        socket_name: String,
        timestamp: Instant,
        attempt: u32,
        delay: Duration,
    },
    /// A new connection was established; the attempt counter was reset.
    Connected {
        socket_name: String,
        timestamp: Instant,
        after_attempts: u32,
    },
    /// The attempt ceiling was reached.
    AttemptsExhausted {
        socket_name: String,
        timestamp: Instant,
        attempts: u32,
    },
}

impl ResilienceEvent for ReconnectEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ReconnectEvent::StateTransition { .. } => "state_transition",
            ReconnectEvent::ReconnectScheduled { .. } => "reconnect_scheduled",
            ReconnectEvent::Connected { .. } => "connected",
            ReconnectEvent::AttemptsExhausted { .. } => "attempts_exhausted",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            ReconnectEvent::StateTransition { timestamp, .. }
            | ReconnectEvent::ReconnectScheduled { timestamp, .. }
            | ReconnectEvent::Connected { timestamp, .. }
            | ReconnectEvent::AttemptsExhausted { timestamp, .. } => *timestamp,
        }
    }

    fn socket_name(&self) -> &str {
        match self {
            ReconnectEvent::StateTransition { socket_name, .. }
            | ReconnectEvent::ReconnectScheduled { socket_name, .. }
            | ReconnectEvent::Connected { socket_name, .. }
            | ReconnectEvent::AttemptsExhausted { socket_name, .. } => socket_name,
        }
    }
}
