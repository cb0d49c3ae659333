use super::{remaining, steady, supervisor};
use socket_resilience_core::{ConnectionState, Socket, SocketError, TransportError};
use socket_resilience_reconnect::{ReconnectConfig, ReconnectPolicy};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn delays_grow_until_attempts_run_out() {
    let exhausted = Arc::new(AtomicU32::new(0));
    let config = ReconnectConfig::builder()
        .policy(steady(3))
        .on_exhausted({
            let exhausted = Arc::clone(&exhausted);
            move |attempts| exhausted.store(attempts, Ordering::SeqCst)
        })
        .build();
    let (supervisor, server) = supervisor(config);
    for _ in 0..4 {
        server.refuse_next(TransportError::TimedOut);
    }
    let mut states = supervisor.state().unwrap();

    supervisor.connect().await;
    let seen = remaining(&mut states).await;

    let delays: Vec<Duration> = seen
        .iter()
        .filter_map(|state| match state {
            ConnectionState::Reconnecting { next_attempt_in } => Some(*next_attempt_in),
            _ => None,
        })
        .collect();
    assert_eq!(
        delays,
        vec![
            Duration::from_millis(500),
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(4),
        ]
    );

    let attempts = seen
        .iter()
        .filter(|state| **state == ConnectionState::Connecting)
        .count();
    assert_eq!(attempts, 4);
    assert_eq!(server.attempts(), 4);

    assert_eq!(
        seen.last(),
        Some(&ConnectionState::Failed(SocketError::ExceededAttempts {
            attempts: 4
        }))
    );
    assert_eq!(exhausted.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn zero_attempts_fails_after_first_loss() {
    let config = ReconnectConfig::builder().policy(steady(0)).build();
    let (supervisor, server) = supervisor(config);
    server.refuse_next(TransportError::NetworkConnectionLost);
    let mut states = supervisor.state().unwrap();

    supervisor.connect().await;
    let seen = remaining(&mut states).await;
    assert_eq!(
        seen.last(),
        Some(&ConnectionState::Failed(SocketError::ExceededAttempts {
            attempts: 1
        }))
    );
    assert_eq!(server.attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn jittered_delays_stay_in_bounds() {
    let policy = ReconnectPolicy::exponential(Duration::from_millis(200), Duration::from_secs(1))
        .jitter(0.5)
        .max_attempts(5);
    let config = ReconnectConfig::builder().policy(policy).build();
    let (supervisor, server) = supervisor(config);
    for _ in 0..6 {
        server.refuse_next(TransportError::TimedOut);
    }
    let mut states = supervisor.state().unwrap();

    supervisor.connect().await;
    let seen = remaining(&mut states).await;

    let mut raw = Duration::from_millis(200);
    for state in &seen {
        if let ConnectionState::Reconnecting { next_attempt_in } = state {
            let delay = next_attempt_in.as_secs_f64();
            assert!(delay >= raw.as_secs_f64() - 1e-6, "{next_attempt_in:?} < {raw:?}");
            assert!(delay <= raw.as_secs_f64() * 1.5 + 1e-6, "{next_attempt_in:?} too long");
            raw = (raw * 2).min(Duration::from_secs(1));
        }
    }
    assert!(matches!(
        seen.last(),
        Some(ConnectionState::Failed(SocketError::ExceededAttempts { attempts: 6 }))
    ));
}
