//! Utility functions and helpers
//!
//! This module contains timestamp utilities and other helper functions.

pub mod time;

pub use time::{ceil_secs, current_timestamp_millis};
