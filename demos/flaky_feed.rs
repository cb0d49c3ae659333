//! A supervised feed over the in-memory transport whose server drops the
//! link twice before settling down.
//!
//! Run with: cargo run --example flaky_feed

use bytes::Bytes;
use socket_resilience::core::{ConnectionState, Socket};
use socket_resilience::engine::memory::MemoryConnector;
use socket_resilience::engine::{EngineConfig, Frame, SocketEngine};
use socket_resilience::reconnect::{ReconnectConfig, ReconnectPolicy, ReconnectSupervisor};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let (connector, mut server) = MemoryConnector::new();
    let engine_config = EngineConfig::builder()
        .name("flaky-feed")
        .heartbeat_interval(Duration::from_secs(2))
        .build();
    let engines = SocketEngine::factory(Arc::new(connector), Arc::new(engine_config));

    let config = ReconnectConfig::builder()
        .name("flaky-feed")
        .policy(
            ReconnectPolicy::exponential(Duration::from_millis(200), Duration::from_secs(5))
                .max_attempts(5),
        )
        .on_reconnect(|attempt, delay| {
            println!("reconnect #{attempt} in {delay:?}");
        })
        .build();
    let supervisor = ReconnectSupervisor::new(engines, config);

    let mut states = supervisor.state().expect("fresh supervisor");
    let mut incoming = supervisor.incoming().expect("fresh supervisor");

    tokio::spawn(async move {
        while let Some(message) = incoming.recv().await {
            match message {
                Ok(payload) => println!("received {:?}", payload),
                Err(error) => println!("frame error: {error}"),
            }
        }
    });

    supervisor.connect().await;

    let mut drops = 0;
    while let Some(state) = states.recv().await {
        println!("state: {state}");
        if state != ConnectionState::Connected {
            continue;
        }

        let Some(mut peer) = server.accept().await else {
            break;
        };
        peer.send(Frame::Text(format!("quote batch {}", drops + 1)));
        let _ = supervisor.send(Bytes::from_static(b"ack")).await;

        if drops < 2 {
            drops += 1;
            peer.disconnect();
        } else {
            tokio::time::sleep(Duration::from_millis(500)).await;
            supervisor.close().await;
        }
    }
}
