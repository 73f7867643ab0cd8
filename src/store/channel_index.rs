//! Channel index
//!
//! Maps channel name to buffer positions, newest first. The index is rebuilt
//! in one pass after every buffer mutation, so positions never go stale.

use std::collections::HashMap;

use crate::types::ChannelSummary;

use super::buffer::MessageBuffer;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChannelIndex {
    /// channel → positions into the buffer (ascending, so newest first)
    buckets: HashMap<String, Vec<usize>>,
}

impl ChannelIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index for the given buffer
    pub fn from_buffer(buffer: &MessageBuffer) -> Self {
        let mut index = Self::new();
        index.rebuild(buffer);
        index
    }

    /// Recompute the partition from scratch
    pub fn rebuild(&mut self, buffer: &MessageBuffer) {
        self.buckets.clear();
        for (pos, message) in buffer.iter().enumerate() {
            self.buckets
                .entry(message.channel.clone())
                .or_default()
                .push(pos);
        }
    }

    /// Buffer positions for one channel; empty if the channel has no messages
    pub fn bucket(&self, channel: &str) -> &[usize] {
        self.buckets.get(channel).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Channels with their message counts, sorted by name
    pub fn channels(&self) -> Vec<ChannelSummary> {
        let mut channels: Vec<ChannelSummary> = self
            .buckets
            .iter()
            .map(|(channel, positions)| ChannelSummary {
                channel: channel.clone(),
                count: positions.len(),
            })
            .collect();
        channels.sort_by(|a, b| a.channel.cmp(&b.channel));
        channels
    }

    /// Number of distinct channels
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
