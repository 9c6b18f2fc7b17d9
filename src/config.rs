use serde::{Deserialize, Serialize};

// Default configuration
pub const DEFAULT_SERVER: &str = "irc.chat.twitch.tv";
pub const DEFAULT_PORT: u16 = 6667;
pub const DEFAULT_MAX_MESSAGES: usize = 60;

/// Client configuration.
///
/// The core never touches persistent storage; an embedding application that
/// wants to remember these values serializes the struct itself and passes it
/// back in on the next run.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ClientConfig {
    /// Gateway hostname
    pub server: String,
    /// Gateway port (plaintext IRC)
    pub port: u16,
    /// Chat buffer capacity; oldest entries are evicted past this
    pub max_messages: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            port: DEFAULT_PORT,
            max_messages: DEFAULT_MAX_MESSAGES,
        }
    }
}
