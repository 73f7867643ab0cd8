//! Field rules for incoming messages
//!
//! All lengths are counted in Unicode code points, not bytes, so Hangul and
//! other multi-byte scripts get the same budget as ASCII.

use crate::error::ValidationError;
use crate::types::{NewMessage, DEFAULT_NICKNAME};

/// Maximum channel name length in characters
pub const MAX_CHANNEL_CHARS: usize = 50;

/// Nicknames longer than this are truncated, not rejected
pub const MAX_NICKNAME_CHARS: usize = 4;

/// Fields of a write that passed validation, already normalized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedFields {
    pub channel: String,
    pub nickname: String,
    pub text: String,
}

/// Check and normalize a write.
///
/// Order matters: text emptiness, text length, then channel. The nickname is
/// never a reason to reject.
pub fn validate_message(
    req: &NewMessage,
    max_text_chars: usize,
) -> Result<ValidatedFields, ValidationError> {
    let text = req.text.trim();
    if text.is_empty() {
        return Err(ValidationError::EmptyText);
    }

    let text_chars = text.chars().count();
    if text_chars > max_text_chars {
        return Err(ValidationError::TextTooLong {
            max: max_text_chars,
            actual: text_chars,
        });
    }

    let channel = req.channel.trim();
    if channel.is_empty() {
        return Err(ValidationError::MissingChannel);
    }

    let channel_chars = channel.chars().count();
    if channel_chars > MAX_CHANNEL_CHARS {
        return Err(ValidationError::ChannelTooLong {
            max: MAX_CHANNEL_CHARS,
            actual: channel_chars,
        });
    }

    Ok(ValidatedFields {
        channel: channel.to_string(),
        nickname: normalize_nickname(req.nickname.as_deref()),
        text: text.to_string(),
    })
}

/// Trim and truncate a nickname, falling back to the placeholder
pub fn normalize_nickname(nickname: Option<&str>) -> String {
    match nickname.map(str::trim) {
        Some(name) if !name.is_empty() => name.chars().take(MAX_NICKNAME_CHARS).collect(),
        _ => DEFAULT_NICKNAME.to_string(),
    }
}
