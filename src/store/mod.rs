//! Message Store - Core data engine
//!
//! `MessageStore` owns the bounded buffer, the channel index, the rate
//! limiter and the announcement behind one lock, so every mutation is a
//! single atomic step and readers only ever see committed state. Accepted
//! messages are handed to the durable log writer while the lock is held,
//! which keeps log order equal to id order.

mod buffer;
mod channel_index;
mod query;
mod rate_limiter;

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info};
use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::config::RelayConfig;
use crate::durable_log::{recover, LogWriter, RecoveryReport};
use crate::error::{RelayError, Result};
use crate::types::{ChannelSummary, Message, MessagePage, NewMessage, StoreStats};
use crate::utils::current_timestamp_millis;
use crate::validation::validate_message;

pub use buffer::MessageBuffer;
pub use channel_index::ChannelIndex;
pub use query::{run_query, MessageQuery, MAX_PAGE_SIZE, MIN_PAGE_SIZE};
pub use rate_limiter::{RateDecision, RateLimiter};

/// Rate-limit entries idle for this many windows are pruned
pub const RATE_LIMIT_RETENTION_FACTOR: u32 = 4;

/// Capacity of the live-update channel; slow subscribers miss older messages
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Everything guarded by the store lock
struct StoreState {
    buffer: MessageBuffer,
    index: ChannelIndex,
    limiter: RateLimiter,
    announcement: String,
    next_id: u64,
}

impl StoreState {
    fn reindex(&mut self) {
        self.index.rebuild(&self.buffer);
    }
}

/// The message store shared by all request handlers
pub struct MessageStore {
    state: RwLock<StoreState>,
    log: Arc<LogWriter>,
    events: broadcast::Sender<Message>,
    max_text_chars: usize,
    default_page_size: usize,
    rate_limit_retention: Duration,
}

impl MessageStore {
    /// Recover from the durable log and open it for appending
    pub fn open(config: &RelayConfig) -> Result<Self> {
        config.validate()?;
        let path = config.log_path();
        let report = recover(&path, config.max_recent)?;
        let log = Arc::new(LogWriter::open(&path, config.max_batch_size)?);
        Ok(Self::from_recovery(config, log, report))
    }

    /// Assemble a store from an already-recovered state
    pub fn from_recovery(config: &RelayConfig, log: Arc<LogWriter>, report: RecoveryReport) -> Self {
        let buffer = MessageBuffer::from_recent(config.max_recent, report.messages);
        let index = ChannelIndex::from_buffer(&buffer);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        info!(
            "Message store ready: {} buffered in {} channels, next id {}",
            buffer.len(),
            index.len(),
            report.next_id
        );

        Self {
            state: RwLock::new(StoreState {
                buffer,
                index,
                limiter: RateLimiter::new(config.rate_window),
                announcement: config.announcement.clone(),
                next_id: report.next_id.max(1),
            }),
            log,
            events,
            max_text_chars: config.max_text_chars,
            default_page_size: config.default_page_size,
            rate_limit_retention: config.rate_limit_retention(),
        }
    }

    /// Handle to the durable log writer (for the flush task)
    pub fn log_writer(&self) -> Arc<LogWriter> {
        Arc::clone(&self.log)
    }

    /// Accept a write from `client_key`
    pub fn post(&self, req: &NewMessage, client_key: &str) -> Result<Message> {
        self.post_at(req, client_key, Instant::now())
    }

    /// Accept a write as if it arrived at `now`.
    ///
    /// Rate limit first, then field validation; a rejection leaves the store
    /// untouched. On success the message is in the buffer and index before
    /// this returns, and queued for the next durable flush.
    pub fn post_at(&self, req: &NewMessage, client_key: &str, now: Instant) -> Result<Message> {
        let mut state = self.state.write();

        if let RateDecision::Denied { retry_after_secs } = state.limiter.check(client_key, now) {
            debug!("Rate limited {} for {}s", client_key, retry_after_secs);
            return Err(RelayError::RateLimited { retry_after_secs });
        }

        let fields = validate_message(req, self.max_text_chars)?;

        let message = Message {
            id: state.next_id,
            timestamp: current_timestamp_millis(),
            channel: fields.channel,
            nickname: fields.nickname,
            text: fields.text,
        };
        state.next_id += 1;
        state.buffer.insert(message.clone());
        state.reindex();
        state.limiter.record(client_key, now);
        self.log.enqueue(&message);
        drop(state);

        // No subscribers is fine
        let _ = self.events.send(message.clone());
        Ok(message)
    }

    /// Fail with `RateLimited` if `client_key` may not write right now.
    /// Records nothing.
    pub fn check_rate(&self, client_key: &str) -> Result<()> {
        match self.state.read().limiter.check(client_key, Instant::now()) {
            RateDecision::Allowed => Ok(()),
            RateDecision::Denied { retry_after_secs } => {
                Err(RelayError::RateLimited { retry_after_secs })
            }
        }
    }

    /// Paginated, filtered read
    pub fn query(&self, query: &MessageQuery) -> MessagePage {
        let state = self.state.read();
        run_query(&state.buffer, &state.index, query, self.default_page_size)
    }

    /// All buffered messages, newest first
    pub fn recent(&self) -> Vec<Message> {
        self.state.read().buffer.iter().cloned().collect()
    }

    /// Channels currently present in the buffer
    pub fn channels(&self) -> Vec<ChannelSummary> {
        self.state.read().index.channels()
    }

    /// Administrative delete by buffer position (0 = newest).
    ///
    /// A tombstone is queued so the message stays deleted after a restart.
    pub fn delete(&self, index: usize) -> Result<Message> {
        let mut state = self.state.write();
        let removed = state.buffer.delete(index)?;
        state.reindex();
        self.log.enqueue_tombstone(removed.id);
        drop(state);

        info!("Deleted message {} at index {}", removed.id, index);
        Ok(removed)
    }

    pub fn announcement(&self) -> String {
        self.state.read().announcement.clone()
    }

    pub fn set_announcement(&self, text: impl Into<String>) {
        self.state.write().announcement = text.into();
        info!("Announcement updated");
    }

    /// Drop rate-limit entries idle for longer than the retention period
    pub fn prune_idle_clients(&self) -> usize {
        self.prune_idle_clients_at(Instant::now())
    }

    pub fn prune_idle_clients_at(&self, now: Instant) -> usize {
        let pruned = self
            .state
            .write()
            .limiter
            .prune(now, self.rate_limit_retention);
        if pruned > 0 {
            debug!("Pruned {} idle rate-limit entries", pruned);
        }
        pruned
    }

    /// Receive every message accepted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.events.subscribe()
    }

    pub fn stats(&self) -> StoreStats {
        let state = self.state.read();
        StoreStats {
            buffered: state.buffer.len(),
            capacity: state.buffer.capacity(),
            channels: state.index.len(),
            tracked_clients: state.limiter.tracked_clients(),
            pending_records: self.log.pending_len(),
            flushed_records: self.log.flushed_records(),
            dropped_records: self.log.dropped_records(),
            failed_flushes: self.log.failed_flushes(),
            next_id: state.next_id,
        }
    }
}
