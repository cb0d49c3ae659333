//! Supervisor metrics regression tests

use super::helpers::*;
use serial_test::serial;
use socket_resilience_core::{ConnectionState, Socket, TransportError};
use socket_resilience_engine::memory::MemoryConnector;
use socket_resilience_engine::{EngineConfig, SocketEngine};
use socket_resilience_reconnect::{ReconnectConfig, ReconnectPolicy, ReconnectSupervisor};
use std::sync::Arc;
use std::time::Duration;

fn policy(max_attempts: u32) -> ReconnectPolicy {
    ReconnectPolicy::exponential(Duration::from_millis(100), Duration::from_secs(1))
        .max_attempts(max_attempts)
}

#[tokio::test(start_paused = true)]
#[serial]
async fn reconnect_metrics_exist() {
    init_recorder();

    let (connector, mut server) = MemoryConnector::new();
    server.refuse_next(TransportError::TimedOut);
    let engines = SocketEngine::factory(Arc::new(connector), Arc::new(EngineConfig::default()));
    let config = ReconnectConfig::builder()
        .name("metrics_reconnect")
        .policy(policy(3))
        .build();
    let supervisor = ReconnectSupervisor::new(engines, config);
    let mut states = supervisor.state().unwrap();

    supervisor.connect().await;
    while let Some(state) = states.recv().await {
        if state == ConnectionState::Connected {
            break;
        }
    }
    let _peer = server.accept().await.unwrap();

    assert_counter_exists("socket_reconnect_attempts_total");
    assert_metric_has_label("socket_reconnect_attempts_total", "socket", "metrics_reconnect");

    assert_counter_exists("socket_reconnect_transitions_total");
    assert_metric_has_label("socket_reconnect_transitions_total", "socket", "metrics_reconnect");
    assert_metric_has_label("socket_reconnect_transitions_total", "to", "connecting");
    assert_metric_has_label("socket_reconnect_transitions_total", "to", "reconnecting");
    assert_metric_has_label("socket_reconnect_transitions_total", "to", "connected");

    assert_gauge_exists("socket_reconnect_connected");
    assert_metric_has_label("socket_reconnect_connected", "socket", "metrics_reconnect");

    supervisor.close().await;
    assert_metric_has_label("socket_reconnect_transitions_total", "to", "closed");
}

#[tokio::test(start_paused = true)]
#[serial]
async fn exhausted_metrics() {
    init_recorder();

    let (connector, server) = MemoryConnector::new();
    for _ in 0..2 {
        server.refuse_next(TransportError::NetworkConnectionLost);
    }
    let engines = SocketEngine::factory(Arc::new(connector), Arc::new(EngineConfig::default()));
    let config = ReconnectConfig::builder()
        .name("metrics_exhausted")
        .policy(policy(1))
        .build();
    let supervisor = ReconnectSupervisor::new(engines, config);
    let mut states = supervisor.state().unwrap();

    supervisor.connect().await;
    while states.recv().await.is_some() {}

    assert_counter_exists("socket_reconnect_exhausted_total");
    assert_metric_has_label("socket_reconnect_exhausted_total", "socket", "metrics_exhausted");
    assert_metric_has_label("socket_reconnect_transitions_total", "to", "failed");
}
