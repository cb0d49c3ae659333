use crate::classifier::{DefaultClassifier, TerminationClassifier};
use crate::events::ReconnectEvent;
use crate::policy::ReconnectPolicy;
use socket_resilience_core::events::{EventListener, EventListeners, FnListener};
use socket_resilience_core::ConnectionState;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for a [`ReconnectSupervisor`](crate::ReconnectSupervisor).
pub struct ReconnectConfig {
    pub(crate) name: String,

    /// Backoff and attempt ceiling.
    pub(crate) policy: ReconnectPolicy,

    /// Decides which terminations are retried.
    pub(crate) classifier: Arc<dyn TerminationClassifier>,

    pub(crate) event_listeners: EventListeners<ReconnectEvent>,
}

impl Clone for ReconnectConfig {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            policy: self.policy.clone(),
            classifier: Arc::clone(&self.classifier),
            event_listeners: self.event_listeners.clone(),
        }
    }
}

impl std::fmt::Debug for ReconnectConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconnectConfig")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("event_listeners", &self.event_listeners.len())
            .finish_non_exhaustive()
    }
}

impl ReconnectConfig {
    /// Creates a new builder for configuring reconnection behavior.
    pub fn builder() -> ReconnectConfigBuilder {
        ReconnectConfigBuilder::default()
    }

    /// Returns the supervisor name used in events, logs and metrics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the reconnection policy.
    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// Returns the termination classifier.
    pub fn classifier(&self) -> &dyn TerminationClassifier {
        self.classifier.as_ref()
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        ReconnectConfigBuilder::default().build()
    }
}

/// Builder for constructing a `ReconnectConfig`.
pub struct ReconnectConfigBuilder {
    name: String,
    policy: ReconnectPolicy,
    classifier: Arc<dyn TerminationClassifier>,
    event_listeners: EventListeners<ReconnectEvent>,
}

impl Default for ReconnectConfigBuilder {
    fn default() -> Self {
        Self {
            name: "<unnamed>".to_string(),
            policy: ReconnectPolicy::default(),
            classifier: Arc::new(DefaultClassifier),
            event_listeners: EventListeners::new(),
        }
    }
}

impl std::fmt::Debug for ReconnectConfigBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconnectConfigBuilder")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("event_listeners", &self.event_listeners.len())
            .finish_non_exhaustive()
    }
}

impl ReconnectConfigBuilder {
    /// Creates a new builder with default settings.
    ///
    /// Defaults:
    /// - name: `"<unnamed>"`
    /// - policy: [`ReconnectPolicy::default`] (500ms doubling to 30s, 20% jitter, 10 attempts)
    /// - classifier: [`DefaultClassifier`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the name for this supervisor (used in events, logs and metrics).
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the reconnection policy.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use socket_resilience_reconnect::{ReconnectConfig, ReconnectPolicy};
    ///
    /// let config = ReconnectConfig::builder()
    ///     .policy(
    ///         ReconnectPolicy::exponential(Duration::from_millis(100), Duration::from_secs(10))
    ///             .max_attempts(3),
    ///     )
    ///     .build();
    /// assert_eq!(config.policy().attempt_limit(), 3);
    /// ```
    pub fn policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the classifier deciding which terminations are retried.
    pub fn classifier<C>(mut self, classifier: C) -> Self
    where
        C: TerminationClassifier,
    {
        self.classifier = Arc::new(classifier);
        self
    }

    /// Registers a callback for every public state transition.
    ///
    /// # Callback Signature
    /// `Fn(Option<&ConnectionState>, &ConnectionState)` - the previous state
    /// (`None` for the first transition) and the new one.
    pub fn on_state_change<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&ConnectionState>, &ConnectionState) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let ReconnectEvent::StateTransition { from, to, .. } = event {
                f(from.as_ref(), to);
            }
        }));
        self
    }

    /// Registers a callback invoked when a reconnect is scheduled.
    ///
    /// # Callback Signature
    /// `Fn(u32, Duration)` - the attempt number (starting at 1) and the delay
    /// before it.
    ///
    /// # Example
    /// ```rust
    /// use socket_resilience_reconnect::ReconnectConfig;
    ///
    /// let config = ReconnectConfig::builder()
    ///     .name("orders")
    ///     .on_reconnect(|attempt, delay| {
    ///         println!("orders: attempt {} in {:?}", attempt, delay);
    ///     })
    ///     .build();
    /// ```
    pub fn on_reconnect<F>(mut self, f: F) -> Self
    where
        F: Fn(u32, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let ReconnectEvent::ReconnectScheduled { attempt, delay, .. } = event {
                f(*attempt, *delay);
            }
        }));
        self
    }

    /// Registers a callback invoked when the attempt ceiling is reached.
    ///
    /// # Callback Signature
    /// `Fn(u32)` - the number of consecutive failed attempts.
    pub fn on_exhausted<F>(mut self, f: F) -> Self
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let ReconnectEvent::AttemptsExhausted { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a listener for every [`ReconnectEvent`].
    pub fn on_event<L>(mut self, listener: L) -> Self
    where
        L: EventListener<ReconnectEvent> + 'static,
    {
        self.event_listeners.add(listener);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> ReconnectConfig {
        ReconnectConfig {
            name: self.name,
            policy: self.policy,
            classifier: self.classifier,
            event_listeners: self.event_listeners,
        }
    }
}
