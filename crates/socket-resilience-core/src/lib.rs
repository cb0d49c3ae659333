//! Core infrastructure for socket-resilience.
//!
//! This crate provides the shared vocabulary used by the engine and the
//! reconnection supervisor:
//! - Connection state and close codes
//! - Error taxonomy for transports, frames, and sessions
//! - The [`Socket`] capability both layers implement
//! - Event system for observability

pub mod error;
pub mod events;
pub mod socket;
pub mod state;

pub use error::{FrameError, SocketError, TransportError};
pub use events::{EventListener, EventListeners, FnListener, ResilienceEvent};
pub use socket::{InboundMessage, MessageStream, Socket, SocketStream, StateStream, StreamSlot};
pub use state::{CloseCode, CloseFrame, ConnectionState};
