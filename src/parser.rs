//! Stateless classification of raw IRC lines from the gateway.
//!
//! Only the commands this client acts on are recognized: PRIVMSG, the 001
//! registration reply, and PING. Everything else classifies as
//! [`ParsedEvent::Unclassified`] and is dropped by the caller without an
//! error. IRCv3 tag segments are skipped, never parsed.

/// A classified inbound line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedEvent {
    /// A chat message for the joined channel
    ChatMessage { sender: String, body: String },
    /// Numeric 001: registration complete, safe to JOIN
    JoinAck,
    /// Server keep-alive; `payload` is everything after the command word
    Ping { payload: String },
    /// Unrecognized or malformed; silently discarded
    Unclassified,
}

/// Strip the leading IRCv3 tag segment (`@key=value;... `) from a line.
///
/// Tag contents are discarded wholesale; a tagged line with no following
/// segment yields an empty remainder.
pub fn strip_tags(line: &str) -> &str {
    match line.strip_prefix('@') {
        Some(rest) => match rest.find(' ') {
            Some(idx) => rest[idx + 1..].trim_start(),
            None => "",
        },
        None => line,
    }
}

/// Classify one raw line received from the socket.
///
/// The PING check runs against the raw line before tag stripping,
/// independently of prefix dispatch, because a bare PING carries no sender
/// prefix.
pub fn parse_line(raw: &str) -> ParsedEvent {
    if let Some(rest) = raw.strip_prefix("PING") {
        return ParsedEvent::Ping {
            payload: rest.trim_start().to_string(),
        };
    }

    let line = strip_tags(raw);
    let Some(rest) = line.strip_prefix(':') else {
        return ParsedEvent::Unclassified;
    };

    let mut fields = rest.splitn(3, ' ');
    let prefix = fields.next().unwrap_or_default();
    let command = fields.next().unwrap_or_default();
    let remainder = fields.next().unwrap_or_default();

    match command {
        "PRIVMSG" => {
            // Sender is the nick part of "nick!user@host".
            let sender = prefix.split('!').next().unwrap_or(prefix).to_string();
            // Body is everything after the first ':' following the target.
            // Parsed structurally, not by offset into the line.
            let body = remainder
                .splitn(2, ':')
                .nth(1)
                .unwrap_or_default()
                .to_string();
            ParsedEvent::ChatMessage { sender, body }
        }
        "001" => ParsedEvent::JoinAck,
        _ => ParsedEvent::Unclassified,
    }
}

/// Build the PONG reply for a PING: same payload, command word substituted.
pub fn pong_for(payload: &str) -> String {
    if payload.is_empty() {
        "PONG".to_string()
    } else {
        format!("PONG {}", payload)
    }
}
