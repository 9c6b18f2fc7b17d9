//! Backend event loop: connection state machine and line dispatch.
//!
//! Runs on a dedicated thread with its own tokio runtime. Reads use a short
//! timeout so the loop stays responsive to consumer actions and the outbound
//! throttle without busy-polling the socket.

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use futures_util::StreamExt;
use tokio::runtime::Runtime;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use super::connection::{self, Transport};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::parser::{self, ParsedEvent};
use crate::protocol::{ClientAction, ClientEvent, Credentials};
use crate::queue::RateLimitedQueue;
use crate::validation;

/// How long one read waits before the loop re-checks actions and the queue
const READ_TICK: Duration = Duration::from_millis(50);
/// Idle sleep while no connection is up
const IDLE_TICK: Duration = Duration::from_millis(50);
/// Cap on consecutive automatic reconnect attempts after read failures
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    /// PASS/NICK sent, waiting for the 001 registration reply
    Authenticating,
    /// Registration acknowledged and JOIN queued
    Joined,
}

/// Run the backend event loop on a tokio runtime.
///
/// Exits when the consumer side of the action channel is dropped.
pub fn run_backend(
    config: ClientConfig,
    action_rx: Receiver<ClientAction>,
    event_tx: Sender<ClientEvent>,
) {
    let rt = match Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            let _ = event_tx.send(ClientEvent::Error(format!(
                "Failed to create Tokio runtime: {}",
                e
            )));
            return;
        }
    };

    rt.block_on(async move {
        let mut backend = Backend::new(config, event_tx);

        loop {
            // Drain actions from the consumer (non-blocking)
            loop {
                match action_rx.try_recv() {
                    Ok(action) => backend.handle_action(action).await,
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        // Consumer handle dropped; shut down cleanly
                        backend.disconnect(false).await;
                        return;
                    }
                }
            }

            // Outbound throttle tick
            backend.pump_outbound().await;

            // Read one line with a short timeout so actions stay responsive
            if backend.transport.is_some() {
                backend.read_tick().await;
            } else {
                tokio::time::sleep(IDLE_TICK).await;
            }
        }
    });
}

/// Everything the backend tracks for one connection.
struct Backend {
    config: ClientConfig,
    state: ConnectionState,
    transport: Option<Transport>,
    /// Kept for the lifetime of one attempt so reconnects reuse them
    credentials: Option<Credentials>,
    outbound: RateLimitedQueue,
    reconnect_attempts: u32,
    event_tx: Sender<ClientEvent>,
}

impl Backend {
    fn new(config: ClientConfig, event_tx: Sender<ClientEvent>) -> Self {
        Self {
            config,
            state: ConnectionState::Disconnected,
            transport: None,
            credentials: None,
            outbound: RateLimitedQueue::new(),
            reconnect_attempts: 0,
            event_tx,
        }
    }

    fn send(&self, event: ClientEvent) {
        // If the consumer is gone the main loop will notice on its next tick
        let _ = self.event_tx.send(event);
    }

    async fn handle_action(&mut self, action: ClientAction) {
        match action {
            ClientAction::Connect(credentials) => {
                self.reconnect_attempts = 0;
                self.connect(credentials).await;
            }
            ClientAction::Disconnect { reconnect } => {
                // An explicit reconnect request is never capped
                self.reconnect_attempts = 0;
                self.disconnect(reconnect).await;
            }
            ClientAction::SendMessage(text) => self.queue_message(&text),
            ClientAction::SendRaw(line) => {
                if self.transport.is_some() {
                    self.outbound.push_raw(line);
                } else {
                    self.send(ClientEvent::Error("Not connected".into()));
                }
            }
        }
    }

    /// Open the socket and register with PASS/NICK.
    ///
    /// Registration lines bypass the rate limiter: they are pre-registration
    /// and the gateway does not throttle them.
    async fn connect(&mut self, credentials: Credentials) {
        if let Err(reason) = validation::validate_credentials(&credentials) {
            let err = ClientError::Config(reason);
            error!(error = %err, "refusing to connect");
            self.send(ClientEvent::Error(err.to_string()));
            return;
        }

        self.state = ConnectionState::Connecting;
        self.credentials = Some(credentials.clone());

        let addr = format!("{}:{}", self.config.server, self.config.port);
        info!(%addr, "connecting to gateway");
        self.send(ClientEvent::Notice(format!("Connecting to {}...", addr)));

        let mut transport =
            match connection::establish_connection(&self.config.server, self.config.port).await {
                Ok(transport) => transport,
                Err(err) => {
                    error!(error = %err, "connect failed");
                    self.state = ConnectionState::Disconnected;
                    self.send(ClientEvent::Error(err.to_string()));
                    return;
                }
            };

        let pass = format!("PASS {}", credentials.token);
        let nick = format!("NICK {}", credentials.nick.to_lowercase());
        for line in [pass, nick] {
            if let Err(err) = connection::send_line(&mut transport, &line).await {
                error!(error = %err, "registration write failed");
                self.state = ConnectionState::Disconnected;
                self.send(ClientEvent::Error(err.to_string()));
                return;
            }
        }

        self.transport = Some(transport);
        self.state = ConnectionState::Authenticating;
        self.send(ClientEvent::Notice("Attempting to connect...".into()));
    }

    /// Tear down the connection. No-op when already disconnected.
    async fn disconnect(&mut self, reconnect: bool) {
        if self.state == ConnectionState::Disconnected {
            return;
        }

        self.state = ConnectionState::Disconnected;
        // Dropping the framed transport closes the socket
        self.transport = None;
        self.outbound.clear();

        info!("disconnected from gateway");
        self.send(ClientEvent::Disconnected("Disconnected from chat".into()));

        if reconnect {
            if let Some(credentials) = self.credentials.clone() {
                if self.reconnect_attempts < MAX_RECONNECT_ATTEMPTS {
                    self.reconnect_attempts += 1;
                    warn!(attempt = self.reconnect_attempts, "reconnecting");
                    self.connect(credentials).await;
                } else {
                    self.send(ClientEvent::Error(
                        "Giving up after repeated reconnect attempts".into(),
                    ));
                }
            }
        }
    }

    /// Queue a PRIVMSG for the joined channel.
    ///
    /// Invalid text (empty, overlong, or carrying line breaks) is rejected
    /// with an error status before anything touches the queue.
    fn queue_message(&mut self, text: &str) {
        if self.transport.is_none() {
            self.send(ClientEvent::Error("Not connected".into()));
            return;
        }
        let Some(credentials) = &self.credentials else {
            return;
        };
        if let Err(reason) = validation::validate_message(text) {
            self.send(ClientEvent::Error(reason));
            return;
        }
        self.outbound.push_privmsg(&credentials.channel, text);
    }

    /// Attempt one read; a timeout is the normal idle case.
    async fn read_tick(&mut self) {
        let result = match self.transport.as_mut() {
            Some(transport) => timeout(READ_TICK, transport.next()).await,
            None => return,
        };

        match result {
            Ok(Some(Ok(line))) => self.handle_line(&line).await,
            Ok(Some(Err(e))) => self.io_failure(ClientError::Read(e.to_string())).await,
            Ok(None) => {
                self.io_failure(ClientError::Read("connection closed by server".into()))
                    .await
            }
            Err(_) => {} // timeout, nothing to read this tick
        }
    }

    /// Classify and dispatch one inbound line.
    async fn handle_line(&mut self, raw: &str) {
        match parser::parse_line(raw) {
            ParsedEvent::ChatMessage { sender, body } => {
                debug!(%sender, "chat message");
                self.send(ClientEvent::Chat {
                    sender,
                    text: body,
                    is_self: false,
                });
            }
            ParsedEvent::JoinAck => {
                if let Some(credentials) = &self.credentials {
                    self.outbound.push_raw(format!("JOIN #{}", credentials.channel));
                }
                self.state = ConnectionState::Joined;
                self.reconnect_attempts = 0;
                info!("registered with gateway");
                self.send(ClientEvent::Connected(
                    "Successfully connected! Now trying to join channel...".into(),
                ));
            }
            ParsedEvent::Ping { payload } => {
                debug!("PING received, queueing PONG");
                self.outbound.push_raw(parser::pong_for(&payload));
            }
            // Unrecognized lines carry no signal for this client
            ParsedEvent::Unclassified => {}
        }
    }

    /// Send the next queued command if the throttle interval has elapsed.
    async fn pump_outbound(&mut self) {
        if self.transport.is_none() {
            return;
        }
        let Some(cmd) = self.outbound.try_pop(Instant::now()) else {
            return;
        };

        if cmd.is_privmsg {
            // The sender sees their own message before it hits the wire
            if let Some(credentials) = &self.credentials {
                if let Some(body) = cmd.line.splitn(2, " :").nth(1) {
                    self.send(ClientEvent::Chat {
                        sender: credentials.nick.clone(),
                        text: body.to_string(),
                        is_self: true,
                    });
                }
            }
        }

        let result = match self.transport.as_mut() {
            Some(transport) => connection::send_line(transport, &cmd.line).await,
            None => return,
        };
        if let Err(err) = result {
            self.io_failure(err).await;
        }
    }

    /// An I/O failure on an established connection forces a disconnect and an
    /// automatic reconnect attempt with the same credentials. Failures before
    /// the connection was established count as an expected stop.
    async fn io_failure(&mut self, err: ClientError) {
        let established = matches!(
            self.state,
            ConnectionState::Authenticating | ConnectionState::Joined
        );
        error!(error = %err, "connection failure");
        if established {
            self.send(ClientEvent::Error(err.to_string()));
            self.disconnect(true).await;
        } else {
            self.disconnect(false).await;
        }
    }
}
