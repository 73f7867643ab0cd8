//! Read-side result types

use serde::{Deserialize, Serialize};

use super::Message;

/// One page of a filtered, newest-first message listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    /// Number of messages matching the filters (all pages)
    pub total: usize,
    pub total_pages: usize,
    pub page: usize,
    pub page_size: usize,
    pub items: Vec<Message>,
}

/// A channel and how many buffered messages it holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSummary {
    pub channel: String,
    pub count: usize,
}

/// Point-in-time counters for the store and its durable log
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub buffered: usize,
    pub capacity: usize,
    pub channels: usize,
    pub tracked_clients: usize,
    pub pending_records: usize,
    pub flushed_records: u64,
    pub dropped_records: u64,
    pub failed_flushes: u64,
    pub next_id: u64,
}
