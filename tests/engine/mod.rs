//! End-to-end tests for `SocketEngine` over the in-memory transport.
//!
//! Test organization:
//! - lifecycle.rs: connect, send, close, handshake failures
//! - frames.rs: inbound frame translation and termination causes
//! - heartbeat.rs: probes, pong deadline, probe write failures

mod heartbeat;

use socket_resilience_core::{ConnectionState, Socket, StateStream};
use socket_resilience_engine::memory::{MemoryConnector, MemoryPeer, MemoryServer};
use socket_resilience_engine::{EngineConfig, SocketEngine};
use std::sync::Arc;

/// Builds an engine over a fresh in-memory transport.
pub(crate) fn engine(config: EngineConfig) -> (SocketEngine, MemoryServer) {
    let (connector, server) = MemoryConnector::new();
    (SocketEngine::new(Arc::new(connector), Arc::new(config)), server)
}

/// Connects and waits for `Connected`, returning the state stream and peer.
pub(crate) async fn connected(
    engine: &SocketEngine,
    server: &mut MemoryServer,
) -> (StateStream, MemoryPeer) {
    let mut states = engine.state().expect("state stream");
    engine.connect().await;
    assert_eq!(states.recv().await, Some(ConnectionState::Connecting));
    assert_eq!(states.recv().await, Some(ConnectionState::Connected));
    let peer = server.accept().await.expect("peer");
    (states, peer)
}
