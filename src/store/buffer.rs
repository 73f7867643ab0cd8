//! Bounded message buffer
//!
//! Holds the most recent `capacity` messages, newest first. Eviction is pure
//! FIFO by insertion order; timestamps play no part.

use std::collections::VecDeque;

use crate::error::{RelayError, Result};
use crate::types::Message;

#[derive(Debug, Clone)]
pub struct MessageBuffer {
    /// Index 0 is the newest message
    messages: VecDeque<Message>,
    capacity: usize,
}

impl MessageBuffer {
    /// Create an empty buffer holding at most `capacity` messages
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Build a buffer from messages already in newest-first order.
    ///
    /// Anything past `capacity` is dropped from the old end.
    pub fn from_recent(capacity: usize, newest_first: Vec<Message>) -> Self {
        let mut messages: VecDeque<Message> = newest_first.into();
        messages.truncate(capacity);
        Self { messages, capacity }
    }

    /// Place a message at the head; returns the evicted tail on overflow
    pub fn insert(&mut self, message: Message) -> Option<Message> {
        self.messages.push_front(message);
        if self.messages.len() > self.capacity {
            self.messages.pop_back()
        } else {
            None
        }
    }

    /// Remove the message at `index` (0 = newest)
    pub fn delete(&mut self, index: usize) -> Result<Message> {
        let len = self.messages.len();
        self.messages
            .remove(index)
            .ok_or(RelayError::NotFound { index, len })
    }

    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    /// Iterate newest first
    pub fn iter(&self) -> impl Iterator<Item = &Message> + '_ {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
pub(crate) fn test_message(id: u64, channel: &str, text: &str) -> Message {
    Message {
        id,
        timestamp: 1_700_000_000_000 + id as i64,
        channel: channel.to_string(),
        nickname: "익명".to_string(),
        text: text.to_string(),
    }
}
