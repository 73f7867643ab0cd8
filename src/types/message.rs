//! Message types for the relay

use serde::{Deserialize, Serialize};

/// Nickname shown when the author leaves it blank ("anonymous")
pub const DEFAULT_NICKNAME: &str = "익명";

/// A stored message. Ids are assigned by the store and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    /// Unix timestamp in milliseconds (UTC)
    pub timestamp: i64,
    pub channel: String,
    pub nickname: String,
    pub text: String,
}

/// An incoming write, before validation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewMessage {
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub nickname: Option<String>,
}

impl NewMessage {
    pub fn new(channel: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            text: text.into(),
            nickname: None,
        }
    }

    pub fn with_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = Some(nickname.into());
        self
    }
}

/// One line of the durable log.
///
/// Untagged so that plain message lines stay the common case; a deletion is
/// recorded as `{"deleted": <id>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogRecord {
    Message(Message),
    Tombstone { deleted: u64 },
}

impl LogRecord {
    /// Serialize to a single JSON line (without the trailing newline)
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parse one JSON line
    pub fn from_json_line(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_line_parses_as_message_record() {
        let line = r#"{"id":7,"timestamp":1700000000000,"channel":"서울","nickname":"익명","text":"도움"}"#;
        match LogRecord::from_json_line(line).unwrap() {
            LogRecord::Message(msg) => {
                assert_eq!(msg.id, 7);
                assert_eq!(msg.channel, "서울");
            }
            other => panic!("unexpected record: {:?}", other),
        }
    }

    #[test]
    fn test_tombstone_line() {
        let record = LogRecord::Tombstone { deleted: 42 };
        let line = record.to_json_line().unwrap();
        assert_eq!(line, r#"{"deleted":42}"#);
        assert_eq!(LogRecord::from_json_line(&line).unwrap(), record);
    }

    #[test]
    fn test_partial_line_is_rejected() {
        assert!(LogRecord::from_json_line(r#"{"id":7,"timestamp":17000"#).is_err());
    }

    #[test]
    fn test_new_message_nickname_is_optional() {
        let req: NewMessage = serde_json::from_str(r#"{"channel":"A","text":"hi"}"#).unwrap();
        assert_eq!(req.nickname, None);
    }
}
