//! Rate-limited outbound command queue.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Minimum interval between two outbound sends. Models the gateway's
/// server-side rate limit; exceeding it risks a temporary ban.
pub const SEND_INTERVAL: Duration = Duration::from_millis(1750);

/// A raw outbound line, tagged for self-echo handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundCommand {
    pub line: String,
    /// PRIVMSG sends are echoed back to the consumer before the write
    pub is_privmsg: bool,
}

/// FIFO of outbound commands with a minimum-interval throttle.
///
/// Lives entirely on the backend thread, so it needs no locking. `try_pop`
/// yields the front element only once the interval since the previous pop
/// has elapsed; there is no floor before the first send. Order is strict
/// FIFO, with no reordering of later-enqueued commands.
#[derive(Debug)]
pub struct RateLimitedQueue {
    commands: VecDeque<OutboundCommand>,
    last_send: Option<Instant>,
    interval: Duration,
}

impl RateLimitedQueue {
    pub fn new() -> Self {
        Self::with_interval(SEND_INTERVAL)
    }

    pub fn with_interval(interval: Duration) -> Self {
        Self {
            commands: VecDeque::new(),
            last_send: None,
            interval,
        }
    }

    /// Queue a raw IRC command line.
    pub fn push_raw(&mut self, line: impl Into<String>) {
        self.commands.push_back(OutboundCommand {
            line: line.into(),
            is_privmsg: false,
        });
    }

    /// Queue a chat message for the given channel.
    pub fn push_privmsg(&mut self, channel: &str, body: &str) {
        self.commands.push_back(OutboundCommand {
            line: format!("PRIVMSG #{} :{}", channel, body),
            is_privmsg: true,
        });
    }

    /// Pop the front command if the throttle interval has elapsed.
    pub fn try_pop(&mut self, now: Instant) -> Option<OutboundCommand> {
        if self.commands.is_empty() {
            return None;
        }
        if let Some(last) = self.last_send {
            if now.duration_since(last) < self.interval {
                return None;
            }
        }
        self.last_send = Some(now);
        self.commands.pop_front()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Drop all pending commands. Called on disconnect so stale PONGs and
    /// JOINs never leak into the next connection.
    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl Default for RateLimitedQueue {
    fn default() -> Self {
        Self::new()
    }
}
