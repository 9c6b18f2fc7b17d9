use std::collections::VecDeque;

use crate::config::DEFAULT_MAX_MESSAGES;

/// One rendered chat line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatEntry {
    /// Wall-clock receive time, formatted HH:MM:SS
    pub timestamp: String,
    /// Display name (first letter upper-cased)
    pub sender: String,
    pub text: String,
    /// True when this entry is our own message echoed locally
    pub is_self: bool,
}

/// Fixed-capacity FIFO of chat entries.
///
/// Owned and mutated only by the consumer thread, so it needs no locking.
/// Appending past capacity evicts the oldest entry first; insertion order is
/// preserved, and iteration runs oldest to newest.
#[derive(Debug)]
pub struct ChatBuffer {
    entries: VecDeque<ChatEntry>,
    capacity: usize,
}

impl ChatBuffer {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_MESSAGES)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry, evicting the oldest when full.
    pub fn push(&mut self, entry: ChatEntry) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Iterate entries oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &ChatEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for ChatBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Upper-case the first character of a sender identifier, remainder unchanged.
pub fn display_name(sender: &str) -> String {
    let mut chars = sender.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
