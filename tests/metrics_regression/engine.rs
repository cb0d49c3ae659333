//! Engine metrics regression tests

use super::helpers::*;
use bytes::Bytes;
use serial_test::serial;
use socket_resilience_core::{ConnectionState, Socket};
use socket_resilience_engine::memory::MemoryConnector;
use socket_resilience_engine::{EngineConfig, Frame, SocketEngine};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
#[serial]
async fn frame_metrics_exist() {
    init_recorder();

    let (connector, mut server) = MemoryConnector::new();
    let config = EngineConfig::builder().name("metrics_frames").build();
    let engine = SocketEngine::new(Arc::new(connector), Arc::new(config));
    let mut states = engine.state().unwrap();
    let mut incoming = engine.incoming().unwrap();

    engine.connect().await;
    assert_eq!(states.recv().await, Some(ConnectionState::Connecting));
    assert_eq!(states.recv().await, Some(ConnectionState::Connected));
    let peer = server.accept().await.unwrap();

    peer.send(Frame::Binary(Bytes::from_static(b"tick")));
    peer.send(Frame::Unsupported);
    assert!(incoming.recv().await.unwrap().is_ok());
    assert!(incoming.recv().await.unwrap().is_err());

    assert_counter_exists("socket_engine_frames_received_total");
    assert_metric_has_label("socket_engine_frames_received_total", "socket", "metrics_frames");
    assert_metric_has_label("socket_engine_frames_received_total", "outcome", "payload");
    assert_metric_has_label("socket_engine_frames_received_total", "outcome", "error");

    engine.close().await;
}

#[tokio::test(start_paused = true)]
#[serial]
async fn heartbeat_timeout_metrics() {
    init_recorder();

    let (connector, mut server) = MemoryConnector::new();
    server.set_silent(true);
    let config = EngineConfig::builder()
        .name("metrics_heartbeat")
        .heartbeat_interval(Duration::from_secs(5))
        .pong_timeout(Duration::from_secs(1))
        .build();
    let engine = SocketEngine::new(Arc::new(connector), Arc::new(config));
    let mut states = engine.state().unwrap();

    engine.connect().await;
    let _peer = server.accept().await.unwrap();
    while let Some(state) = states.recv().await {
        if state.is_terminal() {
            break;
        }
    }

    assert_counter_exists("socket_engine_heartbeat_failures_total");
    assert_metric_has_label(
        "socket_engine_heartbeat_failures_total",
        "socket",
        "metrics_heartbeat",
    );
    assert_metric_has_label("socket_engine_heartbeat_failures_total", "reason", "timeout");
}
