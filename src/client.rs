//! Consumer-facing client handle.

use std::thread;

use chrono::Local;
use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::backend;
use crate::buffer::{display_name, ChatBuffer, ChatEntry};
use crate::config::ClientConfig;
use crate::protocol::{ClientAction, ClientEvent, Credentials, StatusKind};

/// Observer callbacks for chat entries and connection status transitions.
pub trait ChatObserver {
    fn on_chat_entry(&mut self, entry: &ChatEntry);
    fn on_status(&mut self, kind: StatusKind, message: &str);
}

/// Handle to one chat connection.
///
/// Spawns the network backend on its own thread. All methods are
/// non-blocking; every failure surfaces as a status event through
/// [`ChatClient::process_events`], never as a returned error. The backend
/// thread exits when this handle is dropped.
pub struct ChatClient {
    action_tx: Sender<ClientAction>,
    event_rx: Receiver<ClientEvent>,
    buffer: ChatBuffer,
    connected: bool,
}

impl ChatClient {
    pub fn new(config: ClientConfig) -> Self {
        let (action_tx, action_rx) = unbounded::<ClientAction>();
        let (event_tx, event_rx) = unbounded::<ClientEvent>();

        let buffer = ChatBuffer::with_capacity(config.max_messages);

        thread::spawn(move || {
            backend::run_backend(config, action_rx, event_tx);
        });

        Self {
            action_tx,
            event_rx,
            buffer,
            connected: false,
        }
    }

    /// Request a connection with the given credentials.
    ///
    /// Blank fields are rejected by the backend with an `Error` status and no
    /// socket I/O.
    pub fn try_connect(&self, credentials: Credentials) {
        let _ = self.action_tx.send(ClientAction::Connect(credentials));
    }

    /// Send a chat message to the joined channel (rate-limited).
    pub fn send_message(&self, text: impl Into<String>) {
        let _ = self.action_tx.send(ClientAction::SendMessage(text.into()));
    }

    /// Send a raw IRC command line (rate-limited).
    pub fn send_raw_command(&self, line: impl Into<String>) {
        let _ = self.action_tx.send(ClientAction::SendRaw(line.into()));
    }

    /// Disconnect; when `reconnect` is set the backend immediately retries
    /// with the same credentials.
    pub fn disconnect(&self, reconnect: bool) {
        let _ = self.action_tx.send(ClientAction::Disconnect { reconnect });
    }

    /// Whether the last observed lifecycle event was a successful registration.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// The bounded chat buffer, oldest entry first.
    pub fn buffer(&self) -> &ChatBuffer {
        &self.buffer
    }

    /// Drain all pending backend events.
    ///
    /// Chat events become [`ChatEntry`] values appended to the buffer; status
    /// transitions go to the observer. Call this periodically from the owning
    /// thread; the buffer is only ever mutated here, so it needs no locking.
    pub fn process_events<O: ChatObserver>(&mut self, observer: &mut O) {
        while let Ok(event) = self.event_rx.try_recv() {
            match event {
                ClientEvent::Connected(message) => {
                    self.connected = true;
                    observer.on_status(StatusKind::Success, &message);
                }
                ClientEvent::Disconnected(message) => {
                    self.connected = false;
                    self.buffer.clear();
                    observer.on_status(StatusKind::Normal, &message);
                }
                ClientEvent::Notice(message) => {
                    observer.on_status(StatusKind::Normal, &message);
                }
                ClientEvent::Error(message) => {
                    observer.on_status(StatusKind::Error, &message);
                }
                ClientEvent::Chat {
                    sender,
                    text,
                    is_self,
                } => {
                    let entry = ChatEntry {
                        timestamp: Local::now().format("%H:%M:%S").to_string(),
                        sender: display_name(&sender),
                        text,
                        is_self,
                    };
                    self.buffer.push(entry.clone());
                    observer.on_chat_entry(&entry);
                }
            }
        }
    }
}
