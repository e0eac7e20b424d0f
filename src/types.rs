//! Common types used throughout the queue service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier for a chat room (group), as assigned by the chat network
pub type RoomId = i64;

/// Identifier for a chat user, as assigned by the chat network
pub type UserId = i64;

/// Composite key addressing one queue: a queue name scoped to a room
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueKey {
    pub room_id: RoomId,
    pub queue_name: String,
}

impl QueueKey {
    pub fn new(room_id: RoomId, queue_name: impl Into<String>) -> Self {
        Self {
            room_id,
            queue_name: queue_name.into(),
        }
    }
}

impl std::fmt::Display for QueueKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@room:{}", self.queue_name, self.room_id)
    }
}

/// A queued player: unique per user within a given queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub user_id: UserId,
    pub display_name: String,
}

impl Member {
    pub fn new(user_id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
        }
    }
}

/// Chat-network user profile, as delivered by the transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatUser {
    pub id: UserId,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: String,
}

impl ChatUser {
    /// Display form: `@username` when one exists, else "first last"
    pub fn display_name(&self) -> String {
        match &self.username {
            Some(username) => format!("@{}", username),
            None => format!("{} {}", self.first_name, self.last_name),
        }
    }
}

/// The commands a user can issue against a queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    Join,
    Leave,
    Status,
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandKind::Join => write!(f, "join"),
            CommandKind::Leave => write!(f, "leave"),
            CommandKind::Status => write!(f, "status"),
        }
    }
}

/// Inbound command event handed to the core by the transport.
///
/// The transport has already parsed command text, resolved the issuing
/// user's display name, and substituted the configured default queue name
/// when the command omitted one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    pub command: CommandKind,
    pub room_id: RoomId,
    pub queue_name: String,
    pub user_id: UserId,
    pub display_name: String,
    pub timestamp: DateTime<Utc>,
}

/// Outbound message for the transport to deliver to a room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub room_id: RoomId,
    pub text: String,
}

impl Notice {
    pub fn new(room_id: RoomId, text: impl Into<String>) -> Self {
        Self {
            room_id,
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_prefers_username() {
        let user = ChatUser {
            id: 7,
            username: Some("alice".to_string()),
            first_name: "Alice".to_string(),
            last_name: "Smith".to_string(),
        };
        assert_eq!(user.display_name(), "@alice");
    }

    #[test]
    fn test_display_name_falls_back_to_full_name() {
        let user = ChatUser {
            id: 7,
            username: None,
            first_name: "Alice".to_string(),
            last_name: "Smith".to_string(),
        };
        assert_eq!(user.display_name(), "Alice Smith");
    }

    #[test]
    fn test_queue_key_display() {
        let key = QueueKey::new(42, "2v2");
        assert_eq!(key.to_string(), "2v2@room:42");
    }
}
