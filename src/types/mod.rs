//! Data types for the relay
//!
//! This module contains the core data structures shared by the store, the
//! durable log and the HTTP API.

mod message;
mod page;

pub use message::{LogRecord, Message, NewMessage, DEFAULT_NICKNAME};
pub use page::{ChannelSummary, MessagePage, StoreStats};
