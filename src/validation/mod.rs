//! Field validation for incoming writes
//!
//! This module checks and normalizes channel, text and nickname before a
//! message reaches the store.

mod rules;

pub use rules::{
    normalize_nickname, validate_message, ValidatedFields, MAX_CHANNEL_CHARS, MAX_NICKNAME_CHARS,
};
