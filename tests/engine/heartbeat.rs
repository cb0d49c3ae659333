use super::{connected, engine};
use bytes::Bytes;
use socket_resilience_core::{ConnectionState, Socket, SocketError, TransportError};
use socket_resilience_engine::{EngineConfig, EngineConfigBuilder, Frame};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn counting(config: EngineConfigBuilder) -> (EngineConfig, Arc<AtomicUsize>) {
    let failures = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&failures);
    let config = config
        .on_heartbeat_failure(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .build();
    (config, failures)
}

#[tokio::test(start_paused = true)]
async fn probes_follow_the_interval() {
    let config = EngineConfig::builder()
        .heartbeat_interval(Duration::from_secs(5))
        .probe_payload("hb")
        .build();
    let (engine, mut server) = engine(config);
    let (mut states, mut peer) = connected(&engine, &mut server).await;

    let start = tokio::time::Instant::now();
    for _ in 0..3 {
        assert_eq!(peer.recv().await, Some(Frame::Ping(Bytes::from_static(b"hb"))));
    }
    // Initial probe plus two periodic ones.
    assert!(start.elapsed() >= Duration::from_secs(10));
    assert!(start.elapsed() < Duration::from_secs(11));
    assert!(states.try_recv().is_none());

    engine.close().await;
}

#[tokio::test(start_paused = true)]
async fn responsive_peer_stays_connected() {
    let config = EngineConfig::builder()
        .heartbeat_interval(Duration::from_secs(1))
        .pong_timeout(Duration::from_millis(500))
        .build();
    let (engine, mut server) = engine(config);
    let (mut states, _peer) = connected(&engine, &mut server).await;

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(states.try_recv().is_none());

    engine.close().await;
}

#[tokio::test(start_paused = true)]
async fn silent_peer_times_out() {
    let (config, failures) = counting(
        EngineConfig::builder()
            .heartbeat_interval(Duration::from_secs(5))
            .pong_timeout(Duration::from_secs(2)),
    );
    let (engine, mut server) = engine(config);
    server.set_silent(true);
    let (mut states, _peer) = connected(&engine, &mut server).await;

    let start = tokio::time::Instant::now();
    assert_eq!(
        states.recv().await,
        Some(ConnectionState::Failed(SocketError::HeartbeatTimeout))
    );
    assert!(start.elapsed() <= Duration::from_secs(2));
    assert_eq!(failures.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn inbound_data_counts_as_liveness() {
    let config = EngineConfig::builder()
        .heartbeat_interval(Duration::from_secs(5))
        .pong_timeout(Duration::from_secs(2))
        .build();
    let (engine, mut server) = engine(config);
    server.set_silent(true);
    let mut incoming = engine.incoming().unwrap();
    let (mut states, peer) = connected(&engine, &mut server).await;

    peer.send(Frame::Text("still here".to_string()));
    assert!(incoming.recv().await.is_some());

    // The deadline was cleared; the next one starts with the 5s probe.
    tokio::time::sleep(Duration::from_secs(4)).await;
    assert!(states.try_recv().is_none());

    engine.close().await;
}

#[tokio::test(start_paused = true)]
async fn failed_probe_fails_connection() {
    let (config, failures) = counting(
        EngineConfig::builder()
            .heartbeat_interval(Duration::from_secs(5))
            .no_pong_timeout(),
    );
    let (engine, mut server) = engine(config);
    let (mut states, peer) = connected(&engine, &mut server).await;

    peer.fail_writes(TransportError::NetworkConnectionLost);
    assert_eq!(
        states.recv().await,
        Some(ConnectionState::Failed(SocketError::Transport(
            TransportError::NetworkConnectionLost
        )))
    );
    assert_eq!(failures.load(Ordering::SeqCst), 1);
}
