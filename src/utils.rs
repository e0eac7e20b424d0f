//! Utility functions for the queue service

use crate::types::Member;
use chrono::{DateTime, Utc};

/// Fallback capacity when the queue name does not encode one
pub const DEFAULT_CAPACITY: usize = 5;

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Derive a queue's capacity from its name.
///
/// The first character is the capacity when it is a digit 1-9 ("3v3" is a
/// queue of three); any other name gets [`DEFAULT_CAPACITY`]. Capacity is
/// never stored, it is always re-derived from the name.
pub fn queue_capacity(queue_name: &str) -> usize {
    queue_name
        .chars()
        .next()
        .and_then(|c| c.to_digit(10))
        .filter(|&n| (1..=9).contains(&n))
        .map(|n| n as usize)
        .unwrap_or(DEFAULT_CAPACITY)
}

/// Join member display names with ", " in insertion order.
///
/// With `avoid_highlight` the leading `@` is stripped from each name so
/// chat clients do not notify the mentioned users; the final ready
/// announcement keeps the mentions intact.
pub fn format_roster(members: &[Member], avoid_highlight: bool) -> String {
    members
        .iter()
        .map(|m| {
            if avoid_highlight {
                m.display_name
                    .strip_prefix('@')
                    .unwrap_or(&m.display_name)
                    .to_string()
            } else {
                m.display_name.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}
