//! Channel protocol: consumer <-> backend communication.

use serde::{Deserialize, Serialize};

/// Connection settings for one chat session.
///
/// Supplied by the embedding application at connect time and held for the
/// lifetime of one connection attempt; the core never persists these. The
/// serde derives exist so a caller can store them wherever it likes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// OAuth token, e.g. "oauth:abcdef..."
    pub token: String,
    /// Twitch login name (sent lower-cased as NICK)
    pub nick: String,
    /// Channel to join, without the leading '#'
    pub channel: String,
}

/// Actions sent from the consumer to the backend
#[derive(Debug, Clone)]
pub enum ClientAction {
    /// Connect to the gateway and register with PASS/NICK
    Connect(Credentials),
    /// Disconnect; immediately retry with the same credentials if requested
    Disconnect { reconnect: bool },
    /// Send a chat message to the joined channel (rate-limited)
    SendMessage(String),
    /// Send a raw IRC command line (rate-limited)
    SendRaw(String),
}

/// Severity of a connection status report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Normal,
    Success,
    Error,
}

/// Events sent from the backend to the consumer
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Registration acknowledged by the gateway; channel join underway
    Connected(String),
    /// Connection closed, by request or after an I/O failure
    Disconnected(String),
    /// Non-terminal lifecycle report ("Connecting to ...")
    Notice(String),
    /// Connection error; the only error signal that reaches the consumer
    Error(String),
    /// A chat line for the joined channel (inbound, or our own echoed send)
    Chat {
        sender: String,
        text: String,
        is_self: bool,
    },
}
