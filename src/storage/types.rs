use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ChatbookError;

/// A named conversation, as persisted in `chat_sessions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    /// Store-assigned identifier
    pub id: String,
    /// Display label
    pub name: String,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// Last activity in the session
    pub updated_at: DateTime<Utc>,
}

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The signed-in person
    User,
    /// The assistant
    Bot,
}

impl Sender {
    /// Column value used by the stores
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Bot => "bot",
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sender {
    type Err = ChatbookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "bot" => Ok(Self::Bot),
            other => Err(ChatbookError::Store(format!("unknown sender: {}", other))),
        }
    }
}

/// A single message, as persisted in `messages`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique identifier (store-assigned, or local until persisted)
    pub id: String,
    /// Owning session
    pub session_id: String,
    /// Markdown text of the message
    pub message: String,
    /// Author of the message
    pub sender: Sender,
    /// Creation time; orders messages within a session
    pub created_at: DateTime<Utc>,
}

/// Row of the `users` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Store-assigned identifier
    pub id: String,
    /// Unique login name
    pub username: String,
    /// Salted password hash, see [`crate::auth::password`]
    pub password_hash: String,
}

/// Current time truncated to the microsecond precision the stores keep
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_round_trips_through_str() {
        assert_eq!("user".parse::<Sender>().unwrap(), Sender::User);
        assert_eq!("bot".parse::<Sender>().unwrap(), Sender::Bot);
        assert_eq!(Sender::Bot.to_string(), "bot");
        assert!("assistant".parse::<Sender>().is_err());
    }

    #[test]
    fn test_message_deserializes_store_row() {
        let json = r#"{
            "id": "7d2c",
            "session_id": "s1",
            "message": "**hi**",
            "sender": "bot",
            "created_at": "2024-05-01T10:00:00.123456+00:00"
        }"#;
        let msg: ChatMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.sender, Sender::Bot);
        assert_eq!(msg.session_id, "s1");
    }

    #[test]
    fn test_now_has_microsecond_precision() {
        let ts = now();
        assert_eq!(ts.timestamp_subsec_nanos() % 1_000, 0);
    }
}
