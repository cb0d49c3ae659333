use crate::events::EngineEvent;
use bytes::Bytes;
use socket_resilience_core::events::{EventListener, EventListeners, FnListener};
use socket_resilience_core::ConnectionState;
use std::time::Duration;

/// Configuration for a [`SocketEngine`](crate::SocketEngine).
pub struct EngineConfig {
    pub(crate) name: String,
    pub(crate) heartbeat_interval: Duration,
    pub(crate) pong_timeout: Option<Duration>,
    pub(crate) probe_payload: Bytes,
    pub(crate) event_listeners: EventListeners<EngineEvent>,
}

impl EngineConfig {
    /// Creates a new builder for configuring an engine.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }

    /// Returns the engine name used in events, logs and metrics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the delay between heartbeat probes.
    pub fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
    }

    /// Returns how long the engine waits for any frame after a probe.
    pub fn pong_timeout(&self) -> Option<Duration> {
        self.pong_timeout
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfigBuilder::new().build()
    }
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("name", &self.name)
            .field("heartbeat_interval", &self.heartbeat_interval)
            .field("pong_timeout", &self.pong_timeout)
            .field("probe_payload", &self.probe_payload.len())
            .field("event_listeners", &self.event_listeners.len())
            .finish()
    }
}

/// Builder for [`EngineConfig`].
pub struct EngineConfigBuilder {
    name: String,
    heartbeat_interval: Duration,
    pong_timeout: Option<Option<Duration>>,
    probe_payload: Bytes,
    event_listeners: EventListeners<EngineEvent>,
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineConfigBuilder {
    /// Creates a new builder with defaults.
    ///
    /// Defaults:
    /// - name: `"<unnamed>"`
    /// - heartbeat_interval: 10 seconds
    /// - pong_timeout: same as the heartbeat interval
    /// - probe_payload: empty
    pub fn new() -> Self {
        Self {
            name: "<unnamed>".to_string(),
            heartbeat_interval: Duration::from_secs(10),
            pong_timeout: None,
            probe_payload: Bytes::new(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the name for this engine (used in events, logs and metrics).
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the delay between heartbeat probes. Must be non-zero.
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Fails the connection if no frame arrives within `timeout` of a probe.
    pub fn pong_timeout(mut self, timeout: Duration) -> Self {
        self.pong_timeout = Some(Some(timeout));
        self
    }

    /// Only a failed probe write counts as a heartbeat failure.
    pub fn no_pong_timeout(mut self) -> Self {
        self.pong_timeout = Some(None);
        self
    }

    /// Sets the payload carried by every heartbeat probe.
    pub fn probe_payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.probe_payload = payload.into();
        self
    }

    /// Registers a callback for every state transition.
    ///
    /// # Callback Signature
    /// `Fn(Option<&ConnectionState>, &ConnectionState)` - the previous state
    /// (`None` for the first transition) and the new one.
    ///
    /// # Example
    /// ```rust
    /// use socket_resilience_engine::EngineConfig;
    ///
    /// let config = EngineConfig::builder()
    ///     .name("quotes")
    ///     .on_state_change(|from, to| {
    ///         println!("quotes: {:?} -> {}", from, to);
    ///     })
    ///     .build();
    /// ```
    pub fn on_state_change<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&ConnectionState>, &ConnectionState) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let EngineEvent::StateTransition { from, to, .. } = event {
                f(from.as_ref(), to);
            }
        }));
        self
    }

    /// Registers a callback for heartbeat failures (failed probe or pong timeout).
    pub fn on_heartbeat_failure<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if matches!(
                event,
                EngineEvent::HeartbeatFailed { .. } | EngineEvent::HeartbeatTimedOut { .. }
            ) {
                f();
            }
        }));
        self
    }

    /// Registers a listener for every [`EngineEvent`].
    ///
    /// # Example
    /// ```rust
    /// use socket_resilience_core::FnListener;
    /// use socket_resilience_engine::{EngineConfig, EngineEvent};
    ///
    /// let config = EngineConfig::builder()
    ///     .on_event(FnListener::new(|event: &EngineEvent| {
    ///         if let EngineEvent::FrameCorrupted { socket_name, .. } = event {
    ///             eprintln!("{socket_name}: dropped a corrupted frame");
    ///         }
    ///     }))
    ///     .build();
    /// ```
    pub fn on_event<L>(mut self, listener: L) -> Self
    where
        L: EventListener<EngineEvent> + 'static,
    {
        self.event_listeners.add(listener);
        self
    }

    /// Builds the configuration.
    ///
    /// # Panics
    ///
    /// Panics if the heartbeat interval is zero.
    pub fn build(self) -> EngineConfig {
        if self.heartbeat_interval.is_zero() {
            panic!("heartbeat_interval must be greater than zero");
        }

        EngineConfig {
            name: self.name,
            heartbeat_interval: self.heartbeat_interval,
            pong_timeout: self.pong_timeout.unwrap_or(Some(self.heartbeat_interval)),
            probe_payload: self.probe_payload,
            event_listeners: self.event_listeners,
        }
    }
}
