//! The resilient connection actor.
//!
//! A [`ResilientConnection`] is a handle to a Tokio task that owns the
//! current transport, the handler slots, the attempt counter and the one
//! pending reconnect timer. Every state change happens on that task, so
//! none of it needs a lock. The handle only sends commands and reads a
//! `watch` snapshot of the state; none of its methods block.

use std::future::pending;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use namegame_protocol::{Codec, FrameCodec, Message, MsgPackCodec};
use namegame_transport::{
    Connector, Endpoint, EventReceiver, Transport, TransportError, TransportEvent,
    WebSocketConnector,
};
use tokio::sync::{mpsc, watch};
use tokio::time::Sleep;
use tracing::{debug, error, trace, warn};

use crate::backoff::ReconnectConfig;
use crate::error::ConnectionError;
use crate::visibility::{Visibility, VisibilityObserver};

/// Called after the transport opens.
pub type OpenHandler = Box<dyn FnMut() + Send>;
/// Called with every decoded inbound message, in arrival order.
pub type MessageHandler<M> = Box<dyn FnMut(M) + Send>;
/// Called after the transport closes, before any reconnect is scheduled.
pub type CloseHandler = Box<dyn FnMut() + Send>;

/// Lifecycle of a [`ResilientConnection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// The task has not opened anything yet.
    Idle,
    /// A transport is being opened.
    Connecting,
    /// Frames can flow.
    Open,
    /// No transport and no retry pending.
    Closed,
    /// No transport; a reconnect timer is pending.
    ReconnectScheduled,
}

enum Command<M> {
    Connect,
    Close,
    Send(Vec<u8>),
    SetOnOpen(Option<OpenHandler>),
    SetOnMessage(Option<MessageHandler<M>>),
    SetOnClose(Option<CloseHandler>),
    Shutdown,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Configures and spawns a [`ResilientConnection`].
pub struct ConnectionBuilder<M: Message, K = WebSocketConnector, C = MsgPackCodec> {
    endpoint: Endpoint,
    connector: K,
    codec: FrameCodec<C>,
    reconnect: ReconnectConfig,
    visibility: Option<watch::Receiver<Visibility>>,
    on_open: Option<OpenHandler>,
    on_message: Option<MessageHandler<M>>,
    on_close: Option<CloseHandler>,
}

impl<M: Message, K, C> ConnectionBuilder<M, K, C> {
    /// Uses `connector` to open transports instead of WebSockets.
    pub fn connector<K2: Connector>(self, connector: K2) -> ConnectionBuilder<M, K2, C> {
        ConnectionBuilder {
            endpoint: self.endpoint,
            connector,
            codec: self.codec,
            reconnect: self.reconnect,
            visibility: self.visibility,
            on_open: self.on_open,
            on_message: self.on_message,
            on_close: self.on_close,
        }
    }

    /// Uses a custom payload codec.
    pub fn codec<C2: Codec>(self, codec: FrameCodec<C2>) -> ConnectionBuilder<M, K, C2> {
        ConnectionBuilder {
            endpoint: self.endpoint,
            connector: self.connector,
            codec,
            reconnect: self.reconnect,
            visibility: self.visibility,
            on_open: self.on_open,
            on_message: self.on_message,
            on_close: self.on_close,
        }
    }

    /// Follows `observer` instead of assuming the app is always visible.
    pub fn visibility(mut self, observer: &VisibilityObserver) -> Self {
        self.visibility = Some(observer.subscribe());
        self
    }

    pub fn reconnect(mut self, config: ReconnectConfig) -> Self {
        self.reconnect = config;
        self
    }

    pub fn on_open(mut self, handler: impl FnMut() + Send + 'static) -> Self {
        self.on_open = Some(Box::new(handler));
        self
    }

    pub fn on_message(mut self, handler: impl FnMut(M) + Send + 'static) -> Self {
        self.on_message = Some(Box::new(handler));
        self
    }

    pub fn on_close(mut self, handler: impl FnMut() + Send + 'static) -> Self {
        self.on_close = Some(Box::new(handler));
        self
    }
}

impl<M: Message, K: Connector, C: Codec> ConnectionBuilder<M, K, C> {
    /// Spawns the connection task and starts the first connect.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(self) -> ResilientConnection<M, C> {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Idle);
        let attempts = Arc::new(AtomicU32::new(0));
        let codec = Arc::new(self.codec);

        let (visibility, visibility_live) = match self.visibility {
            Some(rx) => (rx, true),
            // Nobody can ever hide us; park the branch for good.
            None => (watch::channel(Visibility::Visible).1, false),
        };
        let visible = visibility.borrow().is_visible();

        let actor = ConnectionActor::<M, K, C> {
            endpoint: self.endpoint.clone(),
            connector: self.connector,
            codec: Arc::clone(&codec),
            config: self.reconnect.validated(),
            commands: commands_rx,
            visibility,
            visibility_live,
            visible,
            link: None,
            timer: None,
            attempt: 0,
            attempts: Arc::clone(&attempts),
            state: state_tx,
            on_open: self.on_open,
            on_message: self.on_message,
            on_close: self.on_close,
        };

        tokio::spawn(actor.run());

        ResilientConnection {
            endpoint: self.endpoint,
            codec,
            commands: commands_tx,
            state: state_rx,
            attempts,
        }
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// A self-healing connection that speaks one message channel.
///
/// Inbound frames are decoded and handed to the message handler; frames
/// that fail to decode are logged and dropped. When the transport closes
/// while the app is visible, the connection retries with jittered
/// exponential backoff until an open succeeds or the attempt budget runs
/// out.
///
/// Dropping the handle stops the connection.
pub struct ResilientConnection<M: Message, C: Codec = MsgPackCodec> {
    endpoint: Endpoint,
    codec: Arc<FrameCodec<C>>,
    commands: mpsc::UnboundedSender<Command<M>>,
    state: watch::Receiver<ConnectionState>,
    attempts: Arc<AtomicU32>,
}

impl<M: Message> ResilientConnection<M> {
    /// Starts configuring a connection to `endpoint` over WebSockets with
    /// MessagePack payloads.
    pub fn builder(endpoint: Endpoint) -> ConnectionBuilder<M> {
        ConnectionBuilder {
            endpoint,
            connector: WebSocketConnector,
            codec: FrameCodec::new(),
            reconnect: ReconnectConfig::default(),
            visibility: None,
            on_open: None,
            on_message: None,
            on_close: None,
        }
    }

    /// Connects to `url` with every default.
    ///
    /// # Errors
    /// Returns [`ConnectionError::Transport`] if `url` isn't a valid
    /// WebSocket endpoint.
    pub fn open(url: &str) -> Result<Self, ConnectionError> {
        let endpoint = Endpoint::parse(url)?;
        Ok(Self::builder(endpoint).spawn())
    }
}

impl<M: Message, C: Codec> ResilientConnection<M, C> {
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Whether the transport is open right now.
    pub fn connected(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// A receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Reconnect attempts since the last successful open.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Opens a fresh transport, replacing the current one and cancelling
    /// any pending reconnect.
    ///
    /// This is also the only way back after reconnection gave up.
    pub fn connect(&self) -> Result<(), ConnectionError> {
        self.command(Command::Connect)
    }

    /// Closes the transport if it is open.
    ///
    /// This goes through the normal close path, so a visible connection
    /// schedules a reconnect afterwards.
    pub fn close(&self) -> Result<(), ConnectionError> {
        self.command(Command::Close)
    }

    /// Encodes and writes `message` if the connection is open.
    ///
    /// Nothing is queued: while not open, the message is dropped with a
    /// warning and [`ConnectionError::NotOpen`] is returned.
    ///
    /// # Errors
    /// [`ConnectionError::NotOpen`] as above, [`ConnectionError::Protocol`]
    /// if the message can't be encoded, or [`ConnectionError::ActorGone`]
    /// after shutdown.
    pub fn send(&self, message: &M) -> Result<(), ConnectionError> {
        if !self.connected() {
            warn!(
                endpoint = %self.endpoint,
                channel = M::CHANNEL,
                ?message,
                "connection not open, dropping message"
            );
            return Err(ConnectionError::NotOpen);
        }
        let frame = self.codec.encode(message)?;
        self.command(Command::Send(frame))
    }

    pub fn set_on_open(&self, handler: impl FnMut() + Send + 'static) -> Result<(), ConnectionError> {
        self.command(Command::SetOnOpen(Some(Box::new(handler))))
    }

    pub fn clear_on_open(&self) -> Result<(), ConnectionError> {
        self.command(Command::SetOnOpen(None))
    }

    pub fn set_on_message(
        &self,
        handler: impl FnMut(M) + Send + 'static,
    ) -> Result<(), ConnectionError> {
        self.command(Command::SetOnMessage(Some(Box::new(handler))))
    }

    pub fn clear_on_message(&self) -> Result<(), ConnectionError> {
        self.command(Command::SetOnMessage(None))
    }

    pub fn set_on_close(&self, handler: impl FnMut() + Send + 'static) -> Result<(), ConnectionError> {
        self.command(Command::SetOnClose(Some(Box::new(handler))))
    }

    pub fn clear_on_close(&self) -> Result<(), ConnectionError> {
        self.command(Command::SetOnClose(None))
    }

    /// Stops the connection task and drops the transport.
    pub fn shutdown(&self) -> Result<(), ConnectionError> {
        self.command(Command::Shutdown)
    }

    fn command(&self, command: Command<M>) -> Result<(), ConnectionError> {
        self.commands
            .send(command)
            .map_err(|_| ConnectionError::ActorGone)
    }
}

impl<M: Message, C: Codec> std::fmt::Debug for ResilientConnection<M, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientConnection")
            .field("endpoint", &self.endpoint)
            .field("channel", &M::CHANNEL)
            .field("state", &self.state())
            .field("attempts", &self.attempts())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

struct Link<T> {
    transport: T,
    events: EventReceiver,
    open: bool,
    /// Set once we asked the transport to close; a late `Open` is ignored.
    closing: bool,
}

impl<T: Transport> Link<T> {
    fn close(&mut self) {
        self.closing = true;
        self.transport.close();
    }
}

struct ConnectionActor<M: Message, K: Connector, C: Codec> {
    endpoint: Endpoint,
    connector: K,
    codec: Arc<FrameCodec<C>>,
    config: ReconnectConfig,
    commands: mpsc::UnboundedReceiver<Command<M>>,
    visibility: watch::Receiver<Visibility>,
    /// False once every visibility observer is gone.
    visibility_live: bool,
    visible: bool,
    link: Option<Link<K::Transport>>,
    /// At most one pending reconnect.
    timer: Option<Pin<Box<Sleep>>>,
    attempt: u32,
    attempts: Arc<AtomicU32>,
    state: watch::Sender<ConnectionState>,
    on_open: Option<OpenHandler>,
    on_message: Option<MessageHandler<M>>,
    on_close: Option<CloseHandler>,
}

impl<M: Message, K: Connector, C: Codec> ConnectionActor<M, K, C> {
    async fn run(mut self) {
        debug!(endpoint = %self.endpoint, channel = M::CHANNEL, "connection task started");
        self.connect();

        loop {
            tokio::select! {
                biased;

                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                changed = self.visibility.changed(), if self.visibility_live => match changed {
                    Ok(()) => {
                        let visibility = *self.visibility.borrow_and_update();
                        self.handle_visibility(visibility);
                    }
                    Err(_) => {
                        debug!(endpoint = %self.endpoint, "visibility observer gone, keeping last value");
                        self.visibility_live = false;
                    }
                },
                event = next_event(&mut self.link) => self.handle_event(event),
                () = fire(&mut self.timer) => {
                    self.timer = None;
                    self.set_attempt(self.attempt + 1);
                    self.connect();
                }
            }
        }

        self.link = None;
        self.state.send_replace(ConnectionState::Closed);
        debug!(endpoint = %self.endpoint, channel = M::CHANNEL, "connection task stopped");
    }

    fn handle_command(&mut self, command: Command<M>) {
        match command {
            Command::Connect => self.connect(),
            Command::Close => {
                if let Some(link) = self.link.as_mut().filter(|link| link.open) {
                    debug!(id = %link.transport.id(), "closing on request");
                    link.close();
                }
            }
            Command::Send(frame) => match self.link.as_ref().filter(|link| link.open) {
                Some(link) => {
                    if let Err(e) = link.transport.send(frame) {
                        warn!(id = %link.transport.id(), error = %e, "failed to write frame");
                    }
                }
                None => warn!(
                    endpoint = %self.endpoint,
                    channel = M::CHANNEL,
                    "connection closed before send, dropping frame"
                ),
            },
            Command::SetOnOpen(handler) => self.on_open = handler,
            Command::SetOnMessage(handler) => self.on_message = handler,
            Command::SetOnClose(handler) => self.on_close = handler,
            // Handled by the run loop.
            Command::Shutdown => {}
        }
    }

    fn handle_visibility(&mut self, visibility: Visibility) {
        let visible = visibility.is_visible();
        if visible == self.visible {
            return;
        }
        self.visible = visible;

        if visible {
            debug!(endpoint = %self.endpoint, "visible again, connecting");
            self.connect();
        } else {
            debug!(endpoint = %self.endpoint, "hidden, closing and holding off reconnects");
            if let Some(link) = self.link.as_mut() {
                link.close();
            }
            self.cancel_timer();
            if self.link.is_none() {
                self.state.send_replace(ConnectionState::Closed);
            }
        }
    }

    fn handle_event(&mut self, event: Option<TransportEvent>) {
        match event {
            Some(TransportEvent::Open) => self.handle_open(),
            Some(TransportEvent::Message(frame)) => self.handle_frame(&frame),
            Some(TransportEvent::Error(e)) => self.handle_error(e),
            // A vanished event stream is a close too.
            Some(TransportEvent::Close) | None => self.handle_close(),
        }
    }

    fn handle_open(&mut self) {
        let Some(link) = self.link.as_mut() else {
            return;
        };
        if link.closing {
            debug!(id = %link.transport.id(), "opened after close was requested, ignoring");
            return;
        }
        link.open = true;
        debug!(id = %link.transport.id(), endpoint = %self.endpoint, "connection open");

        self.set_attempt(0);
        self.state.send_replace(ConnectionState::Open);
        if let Some(handler) = self.on_open.as_mut() {
            handler();
        }
    }

    fn handle_frame(&mut self, frame: &[u8]) {
        match self.codec.decode::<M>(frame) {
            Ok(message) => {
                trace!(channel = M::CHANNEL, ?message, "message received");
                if let Some(handler) = self.on_message.as_mut() {
                    handler(message);
                }
            }
            Err(e) => {
                warn!(
                    channel = M::CHANNEL,
                    len = frame.len(),
                    error = %e,
                    "dropping undecodable frame"
                );
            }
        }
    }

    fn handle_error(&mut self, e: TransportError) {
        error!(endpoint = %self.endpoint, error = %e, "transport error, forcing close");
        if let Some(link) = self.link.as_mut() {
            link.close();
        }
    }

    fn handle_close(&mut self) {
        if let Some(link) = self.link.take() {
            debug!(id = %link.transport.id(), endpoint = %self.endpoint, "connection closed");
        }
        self.state.send_replace(ConnectionState::Closed);

        if let Some(handler) = self.on_close.as_mut() {
            handler();
        }

        if self.visible {
            warn!(endpoint = %self.endpoint, "connection closed while visible, reconnecting");
            self.schedule_reconnect();
        }
    }

    fn connect(&mut self) {
        self.cancel_timer();

        // Any previous transport is dropped here, and its pending events
        // with it.
        let (transport, events) = self.connector.open(&self.endpoint);
        debug!(
            id = %transport.id(),
            endpoint = %self.endpoint,
            attempt = self.attempt,
            "connecting"
        );
        self.link = Some(Link {
            transport,
            events,
            open: false,
            closing: false,
        });
        self.state.send_replace(ConnectionState::Connecting);
    }

    fn schedule_reconnect(&mut self) {
        if self.config.is_exhausted(self.attempt) {
            let e = ConnectionError::ReconnectExhausted {
                attempts: self.attempt,
            };
            error!(endpoint = %self.endpoint, error = %e, "not reconnecting");
            return;
        }
        if self.timer.is_some() {
            return;
        }

        let delay = self.config.next_delay(self.attempt);
        debug!(
            endpoint = %self.endpoint,
            attempt = self.attempt,
            delay_ms = delay.as_millis() as u64,
            "reconnect scheduled"
        );
        self.timer = Some(Box::pin(tokio::time::sleep(delay)));
        self.state.send_replace(ConnectionState::ReconnectScheduled);
    }

    fn cancel_timer(&mut self) {
        if self.timer.take().is_some() {
            debug!(endpoint = %self.endpoint, "pending reconnect cancelled");
        }
    }

    fn set_attempt(&mut self, attempt: u32) {
        self.attempt = attempt;
        self.attempts.store(attempt, Ordering::Relaxed);
    }
}

/// Next event of the current transport; pends forever without one.
async fn next_event<T>(link: &mut Option<Link<T>>) -> Option<TransportEvent> {
    match link {
        Some(link) => link.events.recv().await,
        None => pending().await,
    }
}

/// Completes when the pending reconnect timer fires; pends without one.
async fn fire(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(sleep) => sleep.as_mut().await,
        None => pending().await,
    }
}
