//! Automatic reconnection for streaming sockets.
//!
//! A [`ReconnectSupervisor`] wraps a factory of single-use engines and keeps
//! one logical connection alive across physical reconnects, presenting a
//! single ordered state stream and a single message stream to its caller.
//!
//! # Features
//!
//! - **Jittered exponential backoff**: [`ReconnectPolicy`] with a delay floor and an attempt ceiling
//! - **Failure classification**: close codes and transport errors decide between retrying and stopping
//! - **Pluggable classifiers**: [`TerminationClassifier`], [`FnClassifier`]
//! - **Event system**: observability through [`ReconnectEvent`]
//! - **Works with any engine**: anything implementing [`Socket`](socket_resilience_core::Socket)
//!
//! # Examples
//!
//! ## Supervising a WebSocket-style engine
//!
//! ```rust
//! use socket_resilience_core::Socket;
//! use socket_resilience_engine::{memory::MemoryConnector, EngineConfig, SocketEngine};
//! use socket_resilience_reconnect::{ReconnectConfig, ReconnectPolicy, ReconnectSupervisor};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let (connector, _server) = MemoryConnector::new();
//! let engines = SocketEngine::factory(Arc::new(connector), Arc::new(EngineConfig::default()));
//!
//! let config = ReconnectConfig::builder()
//!     .name("market-data")
//!     .policy(
//!         ReconnectPolicy::exponential(Duration::from_millis(500), Duration::from_secs(30))
//!             .jitter(0.2)
//!             .max_attempts(10),
//!     )
//!     .on_reconnect(|attempt, delay| {
//!         println!("reconnect attempt {} in {:?}", attempt, delay);
//!     })
//!     .build();
//!
//! let supervisor = ReconnectSupervisor::new(engines, config);
//! supervisor.connect().await;
//! supervisor.close().await;
//! # }
//! ```

mod classifier;
mod config;
mod events;
mod policy;
mod supervisor;

pub use classifier::{
    classify, DefaultClassifier, FailureClassification, FnClassifier, TerminationClassifier,
};
pub use config::{ReconnectConfig, ReconnectConfigBuilder};
pub use events::ReconnectEvent;
pub use policy::{ReconnectPolicy, MIN_DELAY};
pub use supervisor::ReconnectSupervisor;
