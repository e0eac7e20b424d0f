//! Command-text parsing
//!
//! Chat commands look like `/join 2v2`, optionally addressed to a named
//! bot (`/join@pickupbot 2v2`). Parsing is total: anything that is not a
//! well-formed command from a known user is ignored, never an error.

use crate::types::{ChatUser, CommandKind, InboundEvent, RoomId};
use crate::utils::current_timestamp;
use once_cell::sync::Lazy;
use regex::Regex;

/// `/command@botname args` with both the bot name and args optional
static COMMAND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/([^@\s]+)(?:@(\S+))?\s*(.*)$").expect("command regex"));

/// A parsed command before queue-name defaulting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub command: CommandKind,
    pub queue_name: Option<String>,
}

/// Parse raw command text. Returns `None` for non-commands and unknown
/// commands; `join`/`leave` accept the legacy `add`/`remove` spellings.
pub fn parse_command(text: &str) -> Option<ParsedCommand> {
    let caps = COMMAND_RE.captures(text.trim())?;

    let command = match &caps[1] {
        "join" | "add" => CommandKind::Join,
        "leave" | "remove" => CommandKind::Leave,
        "status" => CommandKind::Status,
        _ => return None,
    };

    let queue_name = caps
        .get(3)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Some(ParsedCommand {
        command,
        queue_name,
    })
}

/// Build an inbound event from a room, a user, and command text,
/// substituting the configured default queue when the command names none.
///
/// Returns `None` when the text is not a command; the transport drops
/// those silently.
pub fn parse_event(
    room_id: RoomId,
    user: &ChatUser,
    text: &str,
    default_queue: &str,
) -> Option<InboundEvent> {
    let parsed = parse_command(text)?;

    Some(InboundEvent {
        command: parsed.command,
        room_id,
        queue_name: parsed
            .queue_name
            .unwrap_or_else(|| default_queue.to_string()),
        user_id: user.id,
        display_name: user.display_name(),
        timestamp: current_timestamp(),
    })
}
