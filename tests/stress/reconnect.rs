//! Reconnect stress tests

use socket_resilience_core::{ConnectionState, Socket, TransportError};
use socket_resilience_engine::memory::MemoryConnector;
use socket_resilience_engine::{EngineConfig, SocketEngine};
use socket_resilience_reconnect::{ReconnectConfig, ReconnectPolicy, ReconnectSupervisor};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

fn quick_policy(max_attempts: u32) -> ReconnectPolicy {
    ReconnectPolicy::exponential(Duration::from_millis(100), Duration::from_millis(400))
        .max_attempts(max_attempts)
}

/// Test: Thousands of drops on one supervisor
#[tokio::test(start_paused = true)]
#[ignore]
async fn stress_reconnect_churn() {
    let scheduled = Arc::new(AtomicU32::new(0));
    let highest = Arc::new(AtomicU32::new(0));
    let (connector, mut server) = MemoryConnector::new();
    let engines = SocketEngine::factory(Arc::new(connector), Arc::new(EngineConfig::default()));
    let config = ReconnectConfig::builder()
        .name("churn")
        .policy(quick_policy(3))
        .on_reconnect({
            let scheduled = Arc::clone(&scheduled);
            let highest = Arc::clone(&highest);
            move |attempt, _| {
                scheduled.fetch_add(1, Ordering::Relaxed);
                highest.fetch_max(attempt, Ordering::Relaxed);
            }
        })
        .build();
    let supervisor = ReconnectSupervisor::new(engines, config);
    let mut states = supervisor.state().unwrap();

    supervisor.connect().await;
    let mut connects = 0;
    while let Some(state) = states.recv().await {
        if state != ConnectionState::Connected {
            continue;
        }
        connects += 1;
        let mut peer = server.accept().await.unwrap();
        if connects == 2_000 {
            break;
        }
        peer.disconnect();
    }

    supervisor.close().await;
    assert_eq!(scheduled.load(Ordering::Relaxed), 1_999);
    // Every drop followed a successful connect, so the counter never grew past one.
    assert_eq!(highest.load(Ordering::Relaxed), 1);
    assert_eq!(server.attempts(), 2_000);
}

/// Test: Many supervisors exhausting their budget concurrently
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn stress_concurrent_exhaustion() {
    let start = Instant::now();
    let mut handles = Vec::new();

    for i in 0..200 {
        handles.push(tokio::spawn(async move {
            let (connector, server) = MemoryConnector::new();
            for _ in 0..3 {
                server.refuse_next(TransportError::TimedOut);
            }
            let engines =
                SocketEngine::factory(Arc::new(connector), Arc::new(EngineConfig::default()));
            let config = ReconnectConfig::builder()
                .name(format!("feed-{i}"))
                .policy(quick_policy(2))
                .build();
            let supervisor = ReconnectSupervisor::new(engines, config);
            let mut states = supervisor.state().unwrap();

            supervisor.connect().await;
            let mut last = None;
            while let Some(state) = states.recv().await {
                last = Some(state);
            }
            (last, server.attempts())
        }));
    }

    for handle in handles {
        let (last, attempts) = handle.await.unwrap();
        assert!(matches!(last, Some(ConnectionState::Failed(_))));
        assert_eq!(attempts, 3);
    }
    println!("200 supervisors exhausted in {:?}", start.elapsed());
}
