//! One physical connection attempt, end to end.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::{SinkExt, StreamExt};
use socket_resilience_core::{
    CloseCode, CloseFrame, ConnectionState, FrameError, InboundMessage, MessageStream, Socket,
    SocketError, StateStream, StreamSlot, TransportError,
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

#[cfg(feature = "metrics")]
use metrics::counter;

use crate::config::EngineConfig;
use crate::events::EngineEvent;
use crate::transport::{Connection, Connector, Frame, FrameSink, FrameSource};

/// Manages exactly one physical connection attempt.
///
/// An engine is single-use: once it has emitted a terminal state it never
/// connects again. Build a fresh engine for every attempt.
///
/// `connect` emits [`ConnectionState::Connecting`] and returns immediately;
/// a driver task then performs the handshake, sends an initial heartbeat
/// probe, emits [`ConnectionState::Connected`], and from there multiplexes the
/// receive loop, the heartbeat loop and caller commands. Because one task
/// owns the transport, state emissions are strictly sequential.
///
/// # Examples
///
/// ```rust
/// use socket_resilience_engine::{memory::MemoryConnector, EngineConfig, SocketEngine};
/// use socket_resilience_core::{ConnectionState, Socket};
/// use futures::StreamExt;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() {
/// let (connector, mut server) = MemoryConnector::new();
/// let engine = SocketEngine::new(Arc::new(connector), Arc::new(EngineConfig::default()));
/// let mut states = engine.state().unwrap();
///
/// engine.connect().await;
/// assert_eq!(states.next().await, Some(ConnectionState::Connecting));
/// assert_eq!(states.next().await, Some(ConnectionState::Connected));
///
/// let _peer = server.accept().await.unwrap();
/// engine.close().await;
/// # }
/// ```
pub struct SocketEngine {
    connector: Arc<dyn Connector>,
    config: Arc<EngineConfig>,
    states: StreamSlot<ConnectionState>,
    messages: StreamSlot<InboundMessage>,
    control: Mutex<Control>,
}

enum Control {
    Idle {
        emitter: Emitter,
        messages: mpsc::UnboundedSender<InboundMessage>,
    },
    Running {
        commands: mpsc::UnboundedSender<Command>,
        driver: JoinHandle<()>,
    },
    Terminated,
}

enum Command {
    Send {
        payload: Bytes,
        reply: oneshot::Sender<Result<(), SocketError>>,
    },
    Close {
        done: oneshot::Sender<()>,
    },
}

impl SocketEngine {
    /// Creates an idle engine that will connect through `connector`.
    pub fn new(connector: Arc<dyn Connector>, config: Arc<EngineConfig>) -> Self {
        let (state_tx, states) = StateStream::channel();
        let (message_tx, messages) = MessageStream::channel();
        let emitter = Emitter {
            config: Arc::clone(&config),
            states: state_tx,
            current: None,
        };

        Self {
            connector,
            config,
            states: StreamSlot::new(states),
            messages: StreamSlot::new(messages),
            control: Mutex::new(Control::Idle {
                emitter,
                messages: message_tx,
            }),
        }
    }

    /// Returns a factory producing a fresh engine per call, sharing one
    /// connector and one configuration.
    pub fn factory(
        connector: Arc<dyn Connector>,
        config: Arc<EngineConfig>,
    ) -> impl Fn() -> SocketEngine + Send + Sync + 'static {
        move || SocketEngine::new(Arc::clone(&connector), Arc::clone(&config))
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start(&self) {
        let mut control = self.control();
        let (mut emitter, messages) =
            match std::mem::replace(&mut *control, Control::Terminated) {
                Control::Idle { emitter, messages } => (emitter, messages),
                other => {
                    *control = other;
                    return;
                }
            };

        emitter.transition(ConnectionState::Connecting);

        let (commands, command_rx) = mpsc::unbounded_channel();
        let driver = Driver {
            connector: Arc::clone(&self.connector),
            config: Arc::clone(&self.config),
            emitter,
            messages,
            commands: command_rx,
        };
        let driver = tokio::spawn(driver.run());

        *control = Control::Running { commands, driver };
    }

    async fn write(&self, payload: Bytes) -> Result<(), SocketError> {
        let commands = match &*self.control() {
            Control::Running { commands, .. } => commands.clone(),
            _ => return Err(SocketError::NotConnected),
        };

        let (reply, response) = oneshot::channel();
        if commands.send(Command::Send { payload, reply }).is_err() {
            return Err(SocketError::NotConnected);
        }
        response.await.unwrap_or(Err(SocketError::NotConnected))
    }

    async fn shutdown(&self) {
        let previous = std::mem::replace(&mut *self.control(), Control::Terminated);
        match previous {
            Control::Idle { mut emitter, .. } => {
                emitter.transition(ConnectionState::Closed(CloseFrame::normal()));
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

impl Socket for SocketEngine {
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

impl std::fmt::Debug for SocketEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let phase = match &*self.control() {
            Control::Idle { .. } => "idle",
            Control::Running { .. } => "running",
            Control::Terminated => "terminated",
        };
        f.debug_struct("SocketEngine")
            .field("name", &self.config.name)
            .field("phase", &phase)
            .finish()
    }
}

/// Publishes state transitions to the stream, listeners, logs and metrics.
struct Emitter {
    config: Arc<EngineConfig>,
    states: mpsc::UnboundedSender<ConnectionState>,
    current: Option<ConnectionState>,
}

impl Emitter {
    fn transition(&mut self, to: ConnectionState) {
        if self.current.as_ref().is_some_and(ConnectionState::is_terminal) {
            return;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(socket = %self.config.name, from = ?self.current, to = %to, "engine state transition");

        self.config.event_listeners.emit(&EngineEvent::StateTransition {
            socket_name: self.config.name.clone(),
            timestamp: Instant::now(),
            from: self.current.clone(),
            to: to.clone(),
        });

        let _ = self.states.send(to.clone());
        self.current = Some(to);
    }
}

impl Drop for Emitter {
    // A driver that unwinds or is dropped mid-flight still ends the stream
    // with a terminal state.
    fn drop(&mut self) {
        if self
            .current
            .as_ref()
            .is_some_and(|state| !state.is_terminal())
        {
            #[cfg(feature = "tracing")]
            tracing::error!(socket = %self.config.name, "engine driver stopped without a terminal state");

            self.transition(ConnectionState::Failed(SocketError::EngineStopped));
        }
    }
}

/// Owns the transport for the lifetime of one connection.
struct Driver {
    connector: Arc<dyn Connector>,
    config: Arc<EngineConfig>,
    emitter: Emitter,
    messages: mpsc::UnboundedSender<InboundMessage>,
    commands: mpsc::UnboundedReceiver<Command>,
}

/// How the connected phase ended.
enum Exit {
    Closed(CloseFrame),
    Failed(SocketError),
    /// Closed locally; `done` is signalled after the final state is out.
    Local(Option<oneshot::Sender<()>>),
}

impl Driver {
    async fn run(mut self) {
        let connection = match self.handshake().await {
            Ok(connection) => connection,
            Err(exit) => return self.finish(exit),
        };
        let Connection { mut sink, source } = connection;

        let probe = Frame::Ping(self.config.probe_payload.clone());
        if let Err(error) = sink.send(probe).await {
            return self.finish(Exit::Failed(error.into()));
        }

        self.emitter.transition(ConnectionState::Connected);

        let exit = self.serve(&mut sink, source).await;
        match &exit {
            Exit::Local(_) => {
                let _ = sink.send(Frame::Close(Some(CloseFrame::normal()))).await;
                let _ = sink.close().await;
            }
            Exit::Closed(_) => {
                let _ = sink.close().await;
            }
            Exit::Failed(_) => {}
        }
        self.finish(exit);
    }

    /// Waits for the connector while still answering caller commands.
    async fn handshake(&mut self) -> Result<Connection, Exit> {
        let handshake = self.connector.connect();
        tokio::pin!(handshake);

        loop {
            tokio::select! {
                result = &mut handshake => {
                    #[cfg(feature = "tracing")]
                    if let Err(ref error) = result {
                        tracing::warn!(socket = %self.config.name, %error, "handshake failed");
                    }
                    return result.map_err(|error| Exit::Failed(error.into()));
                }
                command = self.commands.recv() => match command {
                    Some(Command::Send { reply, .. }) => {
                        let _ = reply.send(Err(SocketError::NotConnected));
                    }
                    Some(Command::Close { done }) => return Err(Exit::Local(Some(done))),
                    None => return Err(Exit::Local(None)),
                },
            }
        }
    }

    /// Receive loop, heartbeat loop and command handling for a live connection.
    async fn serve(&mut self, sink: &mut FrameSink, mut source: FrameSource) -> Exit {
        let interval = self.config.heartbeat_interval;
        let mut heartbeat = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        // The initial probe is outstanding.
        let mut pong_deadline = self
            .config
            .pong_timeout
            .map(|timeout| tokio::time::Instant::now() + timeout);

        loop {
            tokio::select! {
                biased;
                command = self.commands.recv() => match command {
                    Some(Command::Send { payload, reply }) => {
                        match sink.send(Frame::Binary(payload)).await {
                            Ok(()) => {
                                let _ = reply.send(Ok(()));
                            }
                            Err(error) => {
                                let _ = reply.send(Err(error.clone().into()));
                                return Exit::Failed(error.into());
                            }
                        }
                    }
                    Some(Command::Close { done }) => return Exit::Local(Some(done)),
                    None => return Exit::Local(None),
                },

                frame = source.next() => {
                    let frame = match frame {
                        Some(Ok(frame)) => frame,
                        Some(Err(error)) => {
                            self.deliver(Err(FrameError::Failed(error.clone())));
                            return Exit::Failed(error.into());
                        }
                        None => return Exit::Closed(CloseFrame::new(CloseCode::AbnormalClosure)),
                    };

                    // Any frame proves the peer is alive.
                    pong_deadline = None;

                    match frame {
                        Frame::Text(text) => self.deliver(Ok(Bytes::from(text))),
                        Frame::Binary(payload) => self.deliver(Ok(payload)),
                        Frame::Ping(payload) => {
                            if let Err(error) = sink.send(Frame::Pong(payload)).await {
                                return Exit::Failed(error.into());
                            }
                        }
                        Frame::Pong(_) => {
                            #[cfg(feature = "tracing")]
                            tracing::trace!(socket = %self.config.name, "pong received");
                        }
                        Frame::Close(frame) => {
                            return Exit::Closed(
                                frame.unwrap_or_else(|| CloseFrame::new(CloseCode::NoStatusReceived)),
                            );
                        }
                        Frame::Unsupported => {
                            self.config.event_listeners.emit(&EngineEvent::FrameCorrupted {
                                socket_name: self.config.name.clone(),
                                timestamp: Instant::now(),
                            });
                            self.deliver(Err(FrameError::Corrupted));
                        }
                    }
                }

                _ = heartbeat.tick() => {
                    if let Err(error) = sink.send(Frame::Ping(self.config.probe_payload.clone())).await {
                        self.heartbeat_failed(&error);
                        return Exit::Failed(error.into());
                    }
                    if pong_deadline.is_none() {
                        pong_deadline = self
                            .config
                            .pong_timeout
                            .map(|timeout| tokio::time::Instant::now() + timeout);
                    }
                }

                _ = tokio::time::sleep_until(pong_deadline.unwrap_or_else(tokio::time::Instant::now)),
                    if pong_deadline.is_some() =>
                {
                    self.heartbeat_timed_out();
                    return Exit::Failed(SocketError::HeartbeatTimeout);
                }

            }
        }
    }

    fn deliver(&self, message: InboundMessage) {
        #[cfg(feature = "metrics")]
        counter!(
            "socket_engine_frames_received_total",
            "socket" => self.config.name.clone(),
            "outcome" => if message.is_ok() { "payload" } else { "error" }
        )
        .increment(1);

        let _ = self.messages.send(message);
    }

    fn heartbeat_failed(&self, error: &TransportError) {
        #[cfg(feature = "tracing")]
        tracing::warn!(socket = %self.config.name, %error, "heartbeat probe failed");

        #[cfg(feature = "metrics")]
        counter!("socket_engine_heartbeat_failures_total", "socket" => self.config.name.clone(), "reason" => "probe")
            .increment(1);

        self.config.event_listeners.emit(&EngineEvent::HeartbeatFailed {
            socket_name: self.config.name.clone(),
            timestamp: Instant::now(),
            error: error.clone(),
        });
    }

    fn heartbeat_timed_out(&self) {
        #[cfg(feature = "tracing")]
        tracing::warn!(socket = %self.config.name, "no frame received within pong timeout");

        #[cfg(feature = "metrics")]
        counter!("socket_engine_heartbeat_failures_total", "socket" => self.config.name.clone(), "reason" => "timeout")
            .increment(1);

        self.config.event_listeners.emit(&EngineEvent::HeartbeatTimedOut {
            socket_name: self.config.name.clone(),
            timestamp: Instant::now(),
        });
    }

    fn finish(mut self, exit: Exit) {
        match exit {
            Exit::Closed(frame) => self.emitter.transition(ConnectionState::Closed(frame)),
            Exit::Failed(error) => self.emitter.transition(ConnectionState::Failed(error)),
            Exit::Local(done) => {
                self.emitter
                    .transition(ConnectionState::Closed(CloseFrame::normal()));
                if let Some(done) = done {
                    let _ = done.send(());
                }
            }
        }
    }
}
