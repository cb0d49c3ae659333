//! Jittered exponential backoff between reconnection attempts.

use std::time::Duration;

use rand::Rng;

/// Lower bound for every computed delay.
pub const MIN_DELAY: Duration = Duration::from_millis(100);

/// Reconnection policy: how long to wait before each attempt, and how many
/// consecutive failures to tolerate.
///
/// The delay for attempt `n` is `min(base * factor^n, max)`, stretched by a
/// random factor in `[1, 1 + jitter]` and never shorter than [`MIN_DELAY`].
/// Jitter only ever lengthens a delay.
///
/// # Examples
///
/// ```
/// use socket_resilience_reconnect::ReconnectPolicy;
/// use std::time::Duration;
///
/// let policy = ReconnectPolicy::exponential(Duration::from_millis(250), Duration::from_secs(10))
///     .factor(1.5)
///     .jitter(0.1)
///     .max_attempts(5);
///
/// let delay = policy.next(0);
/// assert!(delay >= Duration::from_millis(250));
/// assert!(delay <= Duration::from_millis(275));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "PolicySettings"))]
pub struct ReconnectPolicy {
    base: Duration,
    factor: f64,
    max: Duration,
    jitter: f64,
    max_attempts: u32,
}

impl ReconnectPolicy {
    /// Creates an exponential policy growing from `base` up to `max`, with the
    /// default factor, jitter and attempt ceiling.
    pub fn exponential(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            ..Self::default()
        }
    }

    /// Sets the growth factor. Values below 1 are raised to 1.
    pub fn factor(mut self, factor: f64) -> Self {
        self.factor = factor.max(1.0);
        self
    }

    /// Sets the jitter fraction, clamped to `0..=1`.
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.jitter = if jitter.is_nan() {
            0.0
        } else {
            jitter.clamp(0.0, 1.0)
        };
        self
    }

    /// Sets how many consecutive retryable failures are tolerated.
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Returns the first delay before growth.
    pub fn base(&self) -> Duration {
        self.base
    }

    /// Returns the delay cap before jitter.
    pub fn max(&self) -> Duration {
        self.max
    }

    /// Returns the jitter fraction.
    pub fn jitter_fraction(&self) -> f64 {
        self.jitter
    }

    /// Returns the attempt ceiling.
    pub fn attempt_limit(&self) -> u32 {
        self.max_attempts
    }

    /// Computes the delay before attempt `attempt` (0-based) using the
    /// thread-local random source.
    pub fn next(&self, attempt: u32) -> Duration {
        self.next_with(attempt, &mut rand::rng())
    }

    /// Computes the delay before attempt `attempt` with an explicit random
    /// source. A seeded source yields reproducible delays.
    pub fn next_with<R: Rng>(&self, attempt: u32, rng: &mut R) -> Duration {
        let raw = self.raw(attempt);
        let spread = if self.jitter > 0.0 {
            rng.random_range(0.0..=self.jitter)
        } else {
            0.0
        };

        let jittered = raw.as_secs_f64() * (1.0 + spread);
        Duration::try_from_secs_f64(jittered)
            .unwrap_or(Duration::MAX)
            .max(MIN_DELAY)
    }

    /// `min(base * factor^attempt, max)`.
    fn raw(&self, attempt: u32) -> Duration {
        if self.base.is_zero() {
            return Duration::ZERO;
        }
        let scaled = self.base.as_secs_f64() * self.factor.powf(f64::from(attempt));
        if !scaled.is_finite() || scaled >= self.max.as_secs_f64() {
            return self.max;
        }
        Duration::try_from_secs_f64(scaled).map_or(self.max, |scaled| scaled.min(self.max))
    }
}

impl Default for ReconnectPolicy {
    /// 500ms doubling up to 30s, 20% jitter, 10 attempts.
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            factor: 2.0,
            max: Duration::from_secs(30),
            jitter: 0.2,
            max_attempts: 10,
        }
    }
}

/// On-disk representation of a policy.
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
#[serde(default)]
struct PolicySettings {
    base_ms: u64,
    factor: f64,
    max_ms: u64,
    jitter: f64,
    max_attempts: u32,
}

#[cfg(feature = "serde")]
impl Default for PolicySettings {
    fn default() -> Self {
        let policy = ReconnectPolicy::default();
        Self {
            base_ms: policy.base.as_millis() as u64,
            factor: policy.factor,
            max_ms: policy.max.as_millis() as u64,
            jitter: policy.jitter,
            max_attempts: policy.max_attempts,
        }
    }
}

#[cfg(feature = "serde")]
impl From<PolicySettings> for ReconnectPolicy {
    fn from(settings: PolicySettings) -> Self {
        ReconnectPolicy::exponential(
            Duration::from_millis(settings.base_ms),
            Duration::from_millis(settings.max_ms),
        )
        .factor(settings.factor)
        .jitter(settings.jitter)
        .max_attempts(settings.max_attempts)
    }
}
