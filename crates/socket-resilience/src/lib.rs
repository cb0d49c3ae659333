//! Resilient streaming sockets.
//!
//! `socket-resilience` keeps a long-lived, message-oriented connection alive:
//! an engine owns one physical connection (handshake, heartbeats, frame
//! translation), and a supervisor rebuilds engines with jittered exponential
//! backoff whenever a failure is worth retrying. Callers see a single ordered
//! state stream and a single message stream for the whole session.
//!
//! # Layers
//!
//! - **Engine** (`engine` feature): [`engine::SocketEngine`], one attempt end to end
//! - **Reconnect** (`reconnect` feature): [`reconnect::ReconnectSupervisor`],
//!   backoff policy and failure classification
//! - **WebSocket** (`tungstenite` feature): a connector over tokio-tungstenite
//!
//! # Usage
//!
//! ```toml
//! [dependencies]
//! socket-resilience = { version = "0.1", features = ["tungstenite"] }
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! # #[cfg(all(feature = "engine", feature = "reconnect"))]
//! # {
//! use socket_resilience::core::{ConnectionState, Socket};
//! use socket_resilience::engine::{memory::MemoryConnector, EngineConfig, SocketEngine};
//! use socket_resilience::reconnect::{ReconnectConfig, ReconnectSupervisor};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let (connector, _server) = MemoryConnector::new();
//! let engines = SocketEngine::factory(Arc::new(connector), Arc::new(EngineConfig::default()));
//! let supervisor = ReconnectSupervisor::new(engines, ReconnectConfig::default());
//!
//! let mut states = supervisor.state().unwrap();
//! supervisor.connect().await;
//! while let Some(state) = states.recv().await {
//!     if let ConnectionState::Connected = state {
//!         break;
//!     }
//! }
//! # }
//! # }
//! ```
//!
//! # Individual Crates
//!
//! Each layer is also available as a standalone crate:
//!
//! - `socket-resilience-engine`
//! - `socket-resilience-reconnect`
//! - `socket-resilience-core` (shared infrastructure)

// Re-export core (always available)
pub use socket_resilience_core as core;

#[cfg(feature = "engine")]
pub use socket_resilience_engine as engine;

#[cfg(feature = "reconnect")]
pub use socket_resilience_reconnect as reconnect;
