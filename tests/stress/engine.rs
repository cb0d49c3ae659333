//! Engine stress tests

use bytes::Bytes;
use socket_resilience_core::{ConnectionState, Socket};
use socket_resilience_engine::memory::MemoryConnector;
use socket_resilience_engine::{EngineConfig, Frame, SocketEngine};
use std::sync::Arc;
use std::time::Instant;

async fn connected_engine() -> (SocketEngine, socket_resilience_engine::memory::MemoryPeer) {
    let (connector, mut server) = MemoryConnector::new();
    let engine = SocketEngine::new(Arc::new(connector), Arc::new(EngineConfig::default()));
    let mut states = engine.state().unwrap();

    engine.connect().await;
    assert_eq!(states.recv().await, Some(ConnectionState::Connecting));
    assert_eq!(states.recv().await, Some(ConnectionState::Connected));
    let peer = server.accept().await.unwrap();
    (engine, peer)
}

/// Test: High volume outbound sends
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn stress_outbound_volume() {
    let (engine, mut peer) = connected_engine().await;

    let drain = tokio::spawn(async move {
        let mut received = 0usize;
        while let Some(frame) = peer.recv_data().await {
            if let Frame::Close(_) = frame {
                break;
            }
            received += 1;
        }
        received
    });

    let start = Instant::now();
    for i in 0..200_000u64 {
        engine
            .send(Bytes::copy_from_slice(&i.to_be_bytes()))
            .await
            .unwrap();
    }
    let elapsed = start.elapsed();
    engine.close().await;

    let received = drain.await.unwrap();
    println!("200k sends in {:?}", elapsed);
    println!("Throughput: {:.0} frames/sec", 200_000.0 / elapsed.as_secs_f64());
    assert_eq!(received, 200_000);
}

/// Test: Inbound ordering under load
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn stress_inbound_ordering() {
    let (engine, peer) = connected_engine().await;
    let mut incoming = engine.incoming().unwrap();

    let start = Instant::now();
    let producer = tokio::spawn(async move {
        for i in 0..200_000u64 {
            peer.send(Frame::Binary(Bytes::copy_from_slice(&i.to_be_bytes())));
        }
        peer
    });

    for expected in 0..200_000u64 {
        let payload = incoming.recv().await.unwrap().unwrap();
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&payload);
        assert_eq!(u64::from_be_bytes(raw), expected);
    }
    println!("200k inbound frames in {:?}", start.elapsed());

    let _peer = producer.await.unwrap();
    engine.close().await;
}
