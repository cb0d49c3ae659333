//! Property tests for the backoff policy.
//!
//! Invariants tested:
//! - Delays never drop below the floor
//! - Delays never exceed the cap stretched by the jitter fraction
//! - Without jitter, delays never shrink as attempts grow
//! - A seeded random source yields the same delay

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use socket_resilience_reconnect::{ReconnectPolicy, MIN_DELAY};
use std::time::Duration;

fn policy(base_ms: u64, extra_ms: u64, factor: f64, jitter: f64) -> ReconnectPolicy {
    ReconnectPolicy::exponential(
        Duration::from_millis(base_ms),
        Duration::from_millis(base_ms + extra_ms),
    )
    .factor(factor)
    .jitter(jitter)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: every delay lies in [floor, max(max * (1 + jitter), floor)]
    #[test]
    fn delay_is_bounded(
        base_ms in 0u64..5_000,
        extra_ms in 0u64..60_000,
        factor in 1.0f64..4.0,
        jitter in 0.0f64..=1.0,
        attempt in 0u32..200,
        seed in any::<u64>(),
    ) {
        let policy = policy(base_ms, extra_ms, factor, jitter);
        let delay = policy.next_with(attempt, &mut StdRng::seed_from_u64(seed));

        let ceiling = policy.max().as_secs_f64() * (1.0 + jitter) + 1e-6;
        prop_assert!(delay >= MIN_DELAY);
        prop_assert!(
            delay.as_secs_f64() <= ceiling.max(MIN_DELAY.as_secs_f64()),
            "{:?} above {}s", delay, ceiling
        );
    }

    /// Property: without jitter the schedule is non-decreasing
    #[test]
    fn unjittered_delays_never_shrink(
        base_ms in 0u64..5_000,
        extra_ms in 0u64..60_000,
        factor in 1.0f64..4.0,
        attempt in 0u32..100,
    ) {
        let policy = policy(base_ms, extra_ms, factor, 0.0);
        prop_assert!(policy.next(attempt + 1) >= policy.next(attempt));
    }

    /// Property: the same seed gives the same delay
    #[test]
    fn seeded_delays_reproduce(
        jitter in 0.0f64..=1.0,
        attempt in 0u32..50,
        seed in any::<u64>(),
    ) {
        let policy = ReconnectPolicy::default().jitter(jitter);
        let first = policy.next_with(attempt, &mut StdRng::seed_from_u64(seed));
        let second = policy.next_with(attempt, &mut StdRng::seed_from_u64(seed));
        prop_assert_eq!(first, second);
    }
}
