//! Input validation for credentials and outbound chat text.

use crate::protocol::Credentials;

/// Maximum chat message length we will send. The IRC line budget is 512
/// bytes; this leaves room for the PRIVMSG command and channel overhead.
const MAX_MESSAGE_LEN: usize = 400;

/// Check that every credential field is filled in.
///
/// A blank field means no connection attempt is made at all.
pub fn validate_credentials(credentials: &Credentials) -> Result<(), String> {
    if credentials.token.trim().is_empty() {
        return Err("OAuth token is empty".to_string());
    }
    if credentials.nick.trim().is_empty() {
        return Err("Nickname is empty".to_string());
    }
    if credentials.channel.trim().is_empty() {
        return Err("Channel name is empty".to_string());
    }
    Ok(())
}

/// Validates an outbound chat message before it is queued for the wire.
///
/// The error string is surfaced to the consumer as an error status.
pub fn validate_message(msg: &str) -> Result<(), String> {
    if msg.trim().is_empty() {
        return Err("Message cannot be empty".to_string());
    }
    if msg.len() > MAX_MESSAGE_LEN {
        return Err(format!(
            "Message too long (max {} characters)",
            MAX_MESSAGE_LEN
        ));
    }
    // CR/LF inside a message would smuggle extra IRC commands
    if msg.contains('\r') || msg.contains('\n') {
        return Err("Message cannot contain newline characters".to_string());
    }
    Ok(())
}
