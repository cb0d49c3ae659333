//! Single-attempt streaming socket engine.
//!
//! A [`SocketEngine`] owns exactly one physical connection attempt: it runs
//! the handshake through a [`Connector`], proves liveness with an initial
//! probe, keeps the link alive with periodic heartbeats, and translates
//! inbound frames into messages and terminal states. It never reconnects;
//! wrap it in a reconnection supervisor for that.
//!
//! # Features
//!
//! - **Observable lifecycle**: ordered state stream ending in exactly one terminal state
//! - **Heartbeats**: periodic probes with an optional pong deadline
//! - **Pluggable transports**: anything implementing [`Connector`]
//! - **In-memory transport**: [`memory`] for tests and demos
//! - **WebSocket transport**: `tungstenite` feature, backed by tokio-tungstenite
//!
//! # Examples
//!
//! ```rust
//! use socket_resilience_engine::{memory::MemoryConnector, EngineConfig, SocketEngine};
//! use socket_resilience_core::Socket;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let (connector, _server) = MemoryConnector::new();
//! let config = EngineConfig::builder()
//!     .name("prices")
//!     .heartbeat_interval(Duration::from_secs(15))
//!     .on_heartbeat_failure(|| eprintln!("prices: heartbeat failed"))
//!     .build();
//!
//! let new_engine = SocketEngine::factory(Arc::new(connector), Arc::new(config));
//! let engine = new_engine();
//! engine.connect().await;
//! engine.close().await;
//! # }
//! ```

mod config;
mod engine;
mod events;
pub mod memory;
pub mod transport;
#[cfg(feature = "tungstenite")]
pub mod tungstenite;

pub use config::{EngineConfig, EngineConfigBuilder};
pub use engine::SocketEngine;
pub use events::EngineEvent;
pub use transport::{Connection, Connector, Frame, FrameSink, FrameSource};
