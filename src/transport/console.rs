//! Line-oriented local transport
//!
//! Stands in for a real chat network during development: each stdin line
//! is `<username> /command [queue]`, acting as that user in a single
//! room, and notices print to stdout (plain text or JSON). User ids are
//! derived from the username so the same name is the same user across
//! lines.

use crate::error::{QueueError, Result};
use crate::notify::NoticePublisher;
use crate::queue::QueueService;
use crate::transport::parser::parse_event;
use crate::types::{ChatUser, Notice, RoomId, UserId};
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

/// Notice publisher that prints to stdout
pub struct ConsoleNoticePublisher {
    /// Emit notices as JSON objects instead of plain text
    json: bool,
}

impl ConsoleNoticePublisher {
    pub fn new(json: bool) -> Self {
        Self { json }
    }
}

#[async_trait]
impl NoticePublisher for ConsoleNoticePublisher {
    async fn publish_notice(&self, notice: Notice) -> Result<()> {
        if self.json {
            let body = serde_json::to_string(&notice).map_err(|e| {
                QueueError::NoticeDeliveryFailed {
                    message: format!("Failed to encode notice: {}", e),
                }
            })?;
            println!("{}", body);
        } else {
            println!("[room {}] {}", notice.room_id, notice.text);
        }
        Ok(())
    }
}

/// Interactive console session driving the queue service
pub struct ConsoleTransport {
    service: QueueService,
    room_id: RoomId,
    default_queue: String,
}

impl ConsoleTransport {
    pub fn new(service: QueueService, room_id: RoomId, default_queue: String) -> Self {
        Self {
            service,
            room_id,
            default_queue,
        }
    }

    /// Read stdin until EOF, feeding commands to the service
    pub async fn run(&self) -> Result<()> {
        info!(
            "Console transport ready on room {} (default queue: {})",
            self.room_id, self.default_queue
        );
        info!("Lines look like: alice /join 2v2");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            self.handle_line(&line).await;
        }

        info!("Console transport closed (stdin EOF)");
        Ok(())
    }

    /// Process one input line; malformed lines are dropped silently
    async fn handle_line(&self, line: &str) {
        let Some((username, text)) = split_line(line) else {
            debug!("Ignoring malformed console line");
            return;
        };

        let user = console_user(username);
        let Some(event) = parse_event(self.room_id, &user, text, &self.default_queue) else {
            debug!("Ignoring non-command from '{}'", username);
            return;
        };

        if let Err(e) = self.service.handle_event(event).await {
            warn!("Command from '{}' failed: {}", username, e);
        }
    }
}

/// Split `<username> /command ...` into its two halves
fn split_line(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim();
    let (username, rest) = trimmed.split_once(char::is_whitespace)?;
    if username.is_empty() {
        return None;
    }
    Some((username, rest.trim_start()))
}

/// Synthesize a stable chat user from a console username
fn console_user(username: &str) -> ChatUser {
    let mut hasher = DefaultHasher::new();
    username.hash(&mut hasher);

    ChatUser {
        // Keep ids positive and stable per name
        id: (hasher.finish() >> 1) as UserId,
        username: Some(username.to_string()),
        first_name: username.to_string(),
        last_name: String::new(),
    }
}
