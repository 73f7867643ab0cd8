//! Emergency Relay
//!
//! A transient, bursty-write message relay partitioned into named channels,
//! built for short emergency-reporting windows: bounded memory, batched
//! best-effort durability, and a per-client write rate limit.
//!
//! # Features
//!
//! - **Bounded Buffer**: the most recent `max_recent` messages, newest first
//! - **Channel Index**: per-channel views without scanning the whole buffer
//! - **Batched Durable Log**: JSON lines appended on a timer, replayed at startup
//! - **Rate Limiting**: one accepted write per client per window
//! - **Pagination & Search**: case-insensitive substring search over reads
//!
//! # Modules
//!
//! - `types`: Core data structures (Message, MessagePage, LogRecord)
//! - `store`: Buffer, channel index, rate limiter and query engine
//! - `durable_log`: Batched log writer and startup recovery
//! - `validation`: Field rules for incoming writes
//! - `api`: Axum router, REST handlers and SSE stream
//! - `config`: Runtime configuration
//! - `utils`: Utility functions (timestamps, etc.)
//!
//! # Example
//!
//! ```no_run
//! use emergency_relay::{MessageStore, NewMessage, RelayConfig};
//! use emergency_relay::store::MessageQuery;
//!
//! fn main() -> emergency_relay::Result<()> {
//!     let config = RelayConfig::with_data_dir("data");
//!     let store = MessageStore::open(&config)?;
//!     store.post(&NewMessage::new("공지", "급수차 10시 도착"), "127.0.0.1")?;
//!     let page = store.query(&MessageQuery::page(1, 20).in_channel("공지"));
//!     println!("{} messages", page.total);
//!     store.log_writer().flush_now()?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod durable_log;
pub mod error;
pub mod store;
pub mod types;
pub mod utils;
pub mod validation;

// Re-export commonly used items at crate root
pub use config::RelayConfig;
pub use error::{LogError, RelayError, Result, ValidationError};
pub use store::MessageStore;
pub use types::{ChannelSummary, LogRecord, Message, MessagePage, NewMessage, StoreStats};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
