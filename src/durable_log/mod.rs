//! Durable Log Module
//!
//! This module provides the crash-recovery log behind the message buffer:
//! - `LogWriter`: batches accepted messages and appends them on a timer
//! - `recover`: replays the log into the most recent messages at startup
//!
//! # Architecture
//!
//! ```text
//! Write Path:
//! ┌──────────┐    ┌──────────────┐    ┌───────────────┐    ┌────────────────┐
//! │ accepted │───►│ enqueue into │───►│ timer / full  │───►│ append batch   │
//! │ message  │    │ pending batch│    │ batch wakeup  │    │ messages.jsonl │
//! └──────────┘    └──────────────┘    └───────────────┘    └────────────────┘
//!
//! Read Path (Startup):
//! ┌────────────────┐    ┌──────────────────┐    ┌─────────────────┐
//! │ read full log  │───►│ skip bad lines,  │───►│ newest MAX_RECENT│───► Ready!
//! │                │    │ apply tombstones │    │ into the buffer  │
//! └────────────────┘    └──────────────────┘    └─────────────────┘
//! ```
//!
//! The log is append-only and never compacted.

mod recovery;
mod writer;

pub use recovery::{recover, RecoveryReport};
pub use writer::LogWriter;
