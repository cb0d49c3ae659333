//! The reconnection loop.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::future::BoxFuture;
use socket_resilience_core::{
    CloseFrame, ConnectionState, InboundMessage, MessageStream, Socket, SocketError, StateStream,
    StreamSlot,
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

use crate::classifier::FailureClassification;
use crate::config::ReconnectConfig;
use crate::events::ReconnectEvent;

/// How long a finished attempt's message forwarder may take to drain.
const FORWARD_GRACE: Duration = Duration::from_millis(100);

type Factory<E> = Arc<dyn Fn() -> E + Send + Sync>;

/// Keeps one logical connection alive across physical reconnects.
///
/// The supervisor builds a fresh engine per attempt through a factory, forwards
/// the engine's states and messages onto its own streams, and when an engine
/// terminates asks the configured classifier whether to try again. Retryable
/// failures wait out a jittered exponential backoff and reconnect; permanent
/// failures, clean closes and an exhausted attempt budget end the supervisor.
///
/// A single driver task owns the attempt counter and the current engine.
/// The handle only passes it commands, so state emissions are totally ordered.
///
/// # Examples
///
/// ```rust
/// use socket_resilience_core::{ConnectionState, Socket};
/// use socket_resilience_engine::{memory::MemoryConnector, EngineConfig, SocketEngine};
/// use socket_resilience_reconnect::{ReconnectConfig, ReconnectSupervisor};
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() {
/// let (connector, _server) = MemoryConnector::new();
/// let factory = SocketEngine::factory(Arc::new(connector), Arc::new(EngineConfig::default()));
/// let supervisor = ReconnectSupervisor::new(factory, ReconnectConfig::default());
/// let mut states = supervisor.state().unwrap();
///
/// supervisor.connect().await;
/// assert_eq!(states.recv().await, Some(ConnectionState::Connecting));
/// assert_eq!(states.recv().await, Some(ConnectionState::Connected));
///
/// supervisor.close().await;
/// assert!(matches!(states.recv().await, Some(ConnectionState::Closed(_))));
/// assert_eq!(states.recv().await, None);
/// # }
/// ```
pub struct ReconnectSupervisor<E: Socket> {
    factory: Factory<E>,
    config: Arc<ReconnectConfig>,
    states: StreamSlot<ConnectionState>,
    messages: StreamSlot<InboundMessage>,
    control: Mutex<Control<E>>,
}

enum Control<E> {
    Idle {
        publisher: Publisher,
        messages: mpsc::UnboundedSender<InboundMessage>,
    },
    Running {
        commands: mpsc::UnboundedSender<Command<E>>,
        driver: JoinHandle<()>,
    },
    Terminated,
}

enum Command<E> {
    /// Hands out the engine of the current attempt, if there is one.
    Active {
        reply: oneshot::Sender<Option<Arc<E>>>,
    },
    Close {
        done: oneshot::Sender<()>,
    },
}

impl<E: Socket> ReconnectSupervisor<E> {
    /// Creates an idle supervisor. `factory` is called once per attempt and
    /// must return a fresh, unconnected engine each time.
    pub fn new<F>(factory: F, config: ReconnectConfig) -> Self
    where
        F: Fn() -> E + Send + Sync + 'static,
    {
        let config = Arc::new(config);
        let (state_tx, states) = StateStream::channel();
        let (message_tx, messages) = MessageStream::channel();

        Self {
            factory: Arc::new(factory),
            states: StreamSlot::new(states),
            messages: StreamSlot::new(messages),
            control: Mutex::new(Control::Idle {
                publisher: Publisher {
                    config: Arc::clone(&config),
                    states: state_tx,
                    current: None,
                },
                messages: message_tx,
            }),
            config,
        }
    }

    /// Returns the supervisor configuration.
    pub fn config(&self) -> &ReconnectConfig {
        &self.config
    }

    fn control(&self) -> MutexGuard<'_, Control<E>> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start(&self) {
        let mut control = self.control();
        let (publisher, messages) = match std::mem::replace(&mut *control, Control::Terminated) {
            Control::Idle {
                publisher,
                messages,
            } => (publisher, messages),
            other => {
                *control = other;
                return;
            }
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(socket = %self.config.name, "starting reconnection loop");

        let (commands, command_rx) = mpsc::unbounded_channel();
        let driver = Driver {
            factory: Arc::clone(&self.factory),
            config: Arc::clone(&self.config),
            publisher,
            messages,
            commands: command_rx,
            attempt: 0,
        };
        let driver = tokio::spawn(driver.run());

        *control = Control::Running { commands, driver };
    }

    async fn write(&self, payload: Bytes) -> Result<(), SocketError> {
        let commands = match &*self.control() {
            Control::Running { commands, .. } => commands.clone(),
            _ => return Err(SocketError::NotConnected),
        };

        let (reply, engine) = oneshot::channel();
        if commands.send(Command::Active { reply }).is_err() {
            return Err(SocketError::NotConnected);
        }
        match engine.await {
            Ok(Some(engine)) => engine.send(payload).await,
            _ => Err(SocketError::NotConnected),
        }
    }

    async fn shutdown(&self) {
        let previous = std::mem::replace(&mut *self.control(), Control::Terminated);
        match previous {
            Control::Idle { mut publisher, .. } => {
                publisher.transition(ConnectionState::Closed(CloseFrame::normal()));
            }
            Control::Running { commands, driver } => {
                let (done, finished) = oneshot::channel();
                if commands.send(Command::Close { done }).is_ok() {
                    let _ = finished.await;
                }
                drop(commands);
                let _ = driver.await;
            }
            Control::Terminated => {}
        }
    }
}

impl<E: Socket> Socket for ReconnectSupervisor<E> {
    fn connect(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move { self.start() })
    }

    fn send(&self, payload: Bytes) -> BoxFuture<'_, Result<(), SocketError>> {
        Box::pin(self.write(payload))
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        Box::pin(self.shutdown())
    }

    fn state(&self) -> Option<StateStream> {
        self.states.take()
    }

    fn incoming(&self) -> Option<MessageStream> {
        self.messages.take()
    }
}

impl<E: Socket> std::fmt::Debug for ReconnectSupervisor<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let phase = match &*self.control() {
            Control::Idle { .. } => "idle",
            Control::Running { .. } => "running",
            Control::Terminated => "terminated",
        };
        f.debug_struct("ReconnectSupervisor")
            .field("name", &self.config.name)
            .field("phase", &phase)
            .finish()
    }
}

/// Publishes the supervisor's public state.
struct Publisher {
    config: Arc<ReconnectConfig>,
    states: mpsc::UnboundedSender<ConnectionState>,
    current: Option<ConnectionState>,
}

impl Publisher {
    fn transition(&mut self, to: ConnectionState) {
        if self.current.as_ref().is_some_and(ConnectionState::is_terminal) {
            return;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(socket = %self.config.name, from = ?self.current, to = %to, "supervisor state transition");

        #[cfg(feature = "metrics")]
        {
            counter!("socket_reconnect_transitions_total", "socket" => self.config.name.clone(), "to" => to.label())
                .increment(1);
            gauge!("socket_reconnect_connected", "socket" => self.config.name.clone())
                .set(if to.is_connected() { 1.0 } else { 0.0 });
        }

        self.config
            .event_listeners
            .emit(&ReconnectEvent::StateTransition {
                socket_name: self.config.name.clone(),
                timestamp: Instant::now(),
                from: self.current.clone(),
                to: to.clone(),
            });

        let _ = self.states.send(to.clone());
        self.current = Some(to);
    }
}

/// Owns the attempt counter and the current engine.
struct Driver<E> {
    factory: Factory<E>,
    config: Arc<ReconnectConfig>,
    publisher: Publisher,
    messages: mpsc::UnboundedSender<InboundMessage>,
    commands: mpsc::UnboundedReceiver<Command<E>>,
    attempt: u32,
}

/// How an engine ended.
struct Termination {
    close: Option<CloseFrame>,
    error: Option<SocketError>,
}

enum Step {
    Retry(Termination),
    Stop,
}

enum Next {
    Attempt,
    Stop,
}

impl<E: Socket> Driver<E> {
    async fn run(mut self) {
        loop {
            let limit = self.config.policy.attempt_limit();
            if self.attempt > limit {
                self.exhausted();
                return;
            }

            let termination = match self.attempt_once().await {
                Step::Retry(termination) => termination,
                Step::Stop => return,
            };

            if let Next::Stop = self.settle(termination).await {
                return;
            }
        }
    }

    /// Runs one engine from creation to its terminal state.
    async fn attempt_once(&mut self) -> Step {
        let engine = Arc::new((self.factory)());
        let states = engine.state();
        let mut forwarder = engine.incoming().map(|incoming| self.forward(incoming));

        let termination = match states {
            Some(mut states) => {
                engine.connect().await;
                match self.watch(&engine, &mut states).await {
                    Some(termination) => termination,
                    None => {
                        if let Some(forwarder) = forwarder.take() {
                            forwarder.abort();
                        }
                        return Step::Stop;
                    }
                }
            }
            // An engine whose state stream was already taken cannot be observed.
            None => {
                #[cfg(feature = "tracing")]
                tracing::warn!(socket = %self.config.name, "factory returned an engine without a state stream");

                Termination {
                    close: None,
                    error: Some(SocketError::EngineStopped),
                }
            }
        };

        engine.close().await;
        if let Some(mut forwarder) = forwarder {
            if tokio::time::timeout(FORWARD_GRACE, &mut forwarder)
                .await
                .is_err()
            {
                forwarder.abort();
            }
        }

        Step::Retry(termination)
    }

    /// Forwards engine states until the engine terminates. Returns `None` if
    /// the supervisor was closed meanwhile.
    async fn watch(&mut self, engine: &Arc<E>, states: &mut StateStream) -> Option<Termination> {
        loop {
            tokio::select! {
                biased;
                command = self.commands.recv() => match command {
                    Some(Command::Active { reply }) => {
                        let _ = reply.send(Some(Arc::clone(engine)));
                    }
                    Some(Command::Close { done }) => {
                        engine.close().await;
                        self.closed(Some(done));
                        return None;
                    }
                    None => {
                        engine.close().await;
                        self.closed(None);
                        return None;
                    }
                },

                state = states.recv() => match state {
                    Some(ConnectionState::Connected) => {
                        self.connected();
                        self.publisher.transition(ConnectionState::Connected);
                    }
                    Some(ConnectionState::Closed(frame)) => {
                        return Some(Termination { close: Some(frame), error: None });
                    }
                    Some(ConnectionState::Failed(error)) => {
                        return Some(Termination { close: None, error: Some(error) });
                    }
                    Some(state @ ConnectionState::Connecting) => self.publisher.transition(state),
                    // Backoff belongs to the supervisor.
                    Some(ConnectionState::Reconnecting { .. }) => {}
                    None => {
                        return Some(Termination {
                            close: None,
                            error: Some(SocketError::EngineStopped),
                        });
                    }
                },
            }
        }
    }

    /// Classifies a termination and either stops or waits out the backoff.
    async fn settle(&mut self, termination: Termination) -> Next {
        let Termination { close, error } = termination;
        match self
            .config
            .classifier
            .classify(close.as_ref(), error.as_ref())
        {
            FailureClassification::Closed(frame) => {
                #[cfg(feature = "tracing")]
                tracing::info!(socket = %self.config.name, %frame, "connection closed by peer");

                self.publisher.transition(ConnectionState::Closed(frame));
                Next::Stop
            }
            FailureClassification::NonRetryable(cause) => {
                let cause = cause
                    .or(error)
                    .or_else(|| close.map(SocketError::PeerClosed))
                    .unwrap_or(SocketError::NotConnected);

                #[cfg(feature = "tracing")]
                tracing::warn!(socket = %self.config.name, error = %cause, "permanent failure, not reconnecting");

                self.publisher.transition(ConnectionState::Failed(cause));
                Next::Stop
            }
            FailureClassification::Retryable(_cause) => {
                let delay = self.config.policy.next(self.attempt);
                self.attempt += 1;
                self.scheduled(delay);
                self.publisher.transition(ConnectionState::Reconnecting {
                    next_attempt_in: delay,
                });
                self.backoff(delay).await
            }
        }
    }

    /// Sleeps before the next attempt while still answering commands.
    async fn backoff(&mut self, delay: Duration) -> Next {
        let wake = tokio::time::sleep(delay);
        tokio::pin!(wake);

        loop {
            tokio::select! {
                biased;
                command = self.commands.recv() => match command {
                    Some(Command::Active { reply }) => {
                        let _ = reply.send(None);
                    }
                    Some(Command::Close { done }) => {
                        self.closed(Some(done));
                        return Next::Stop;
                    }
                    None => {
                        self.closed(None);
                        return Next::Stop;
                    }
                },
                _ = &mut wake => return Next::Attempt,
            }
        }
    }

    fn forward(&self, mut incoming: MessageStream) -> JoinHandle<()> {
        let messages = self.messages.clone();
        tokio::spawn(async move {
            while let Some(message) = incoming.recv().await {
                if messages.send(message).is_err() {
                    break;
                }
            }
        })
    }

    fn connected(&mut self) {
        #[cfg(feature = "tracing")]
        if self.attempt > 0 {
            tracing::info!(socket = %self.config.name, attempts = self.attempt, "reconnected");
        }

        self.config
            .event_listeners
            .emit(&ReconnectEvent::Connected {
                socket_name: self.config.name.clone(),
                timestamp: Instant::now(),
                after_attempts: self.attempt,
            });
        self.attempt = 0;
    }

    fn scheduled(&self, delay: Duration) {
        #[cfg(feature = "tracing")]
        tracing::info!(socket = %self.config.name, attempt = self.attempt, ?delay, "scheduling reconnect");

        #[cfg(feature = "metrics")]
        counter!("socket_reconnect_attempts_total", "socket" => self.config.name.clone()).increment(1);

        self.config
            .event_listeners
            .emit(&ReconnectEvent::ReconnectScheduled {
                socket_name: self.config.name.clone(),
                timestamp: Instant::now(),
                attempt: self.attempt,
                delay,
            });
    }

    fn exhausted(&mut self) {
        #[cfg(feature = "tracing")]
        tracing::warn!(socket = %self.config.name, attempts = self.attempt, "reconnect attempts exhausted");

        #[cfg(feature = "metrics")]
        counter!("socket_reconnect_exhausted_total", "socket" => self.config.name.clone()).increment(1);

        self.config
            .event_listeners
            .emit(&ReconnectEvent::AttemptsExhausted {
                socket_name: self.config.name.clone(),
                timestamp: Instant::now(),
                attempts: self.attempt,
            });

        self.publisher
            .transition(ConnectionState::Failed(SocketError::ExceededAttempts {
                attempts: self.attempt,
            }));
    }

    fn closed(&mut self, done: Option<oneshot::Sender<()>>) {
        #[cfg(feature = "tracing")]
        tracing::debug!(socket = %self.config.name, "closed by caller");

        self.publisher
            .transition(ConnectionState::Closed(CloseFrame::normal()));
        if let Some(done) = done {
            let _ = done.send(());
        }
    }
}
