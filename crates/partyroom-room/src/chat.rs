//! Bounded per-room chat log.

use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use partyroom_protocol::{ChatKind, ChatMessage};

/// The most recent chat lines of a room, oldest first.
#[derive(Debug)]
pub struct ChatLog {
    messages: VecDeque<ChatMessage>,
    capacity: usize,
    next_id: u64,
}

impl ChatLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
            next_id: 1,
        }
    }

    /// Appends a line, evicting the oldest past capacity.
    pub fn push(&mut self, sender: &str, text: &str, kind: ChatKind) -> ChatMessage {
        let message = ChatMessage {
            id: self.next_id,
            sender: sender.to_string(),
            text: text.to_string(),
            timestamp: now_millis(),
            kind,
        };
        self.next_id += 1;
        self.messages.push_back(message.clone());
        while self.messages.len() > self.capacity {
            self.messages.pop_front();
        }
        message
    }

    /// Appends a system line.
    pub fn system(&mut self, text: &str) -> ChatMessage {
        self.push("system", text, ChatKind::System)
    }

    pub fn history(&self) -> Vec<ChatMessage> {
        self.messages.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
