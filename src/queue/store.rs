//! Immutable membership store
//!
//! The store is a snapshot value: every mutation returns a new store and
//! the caller swaps it in atomically. Queues are addressed by the flat
//! composite key (room, queue name) rather than nested maps, which keeps
//! copy-on-write updates shallow.

use crate::types::{Member, QueueKey, UserId};
use std::collections::HashMap;

/// Snapshot of all queue memberships across all rooms.
///
/// Absence and emptiness are the same state: a queue whose last member is
/// removed disappears from the map entirely, so two stores that agree on
/// every non-empty queue compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStore {
    queues: HashMap<QueueKey, Vec<Member>>,
}

impl QueueStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Members of a queue in insertion order; empty when the queue is absent
    pub fn members(&self, key: &QueueKey) -> &[Member] {
        self.queues.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of members in a queue; zero when the queue is absent
    pub fn member_count(&self, key: &QueueKey) -> usize {
        self.members(key).len()
    }

    /// Insert or replace the member with a matching user id.
    ///
    /// A repeat join updates the display name in place without changing
    /// the member's position or the queue's count.
    pub fn upsert_member(&self, key: &QueueKey, member: Member) -> Self {
        let mut next = self.clone();
        let queue = next.queues.entry(key.clone()).or_default();
        match queue.iter_mut().find(|m| m.user_id == member.user_id) {
            Some(existing) => *existing = member,
            None => queue.push(member),
        }
        next
    }

    /// Remove the member with the given user id; no-op when absent
    pub fn remove_member(&self, key: &QueueKey, user_id: UserId) -> Self {
        let mut next = self.clone();
        if let Some(queue) = next.queues.get_mut(key) {
            queue.retain(|m| m.user_id != user_id);
            if queue.is_empty() {
                next.queues.remove(key);
            }
        }
        next
    }

    /// Clear a queue's membership, leaving unrelated queues untouched
    pub fn reset_queue(&self, key: &QueueKey) -> Self {
        let mut next = self.clone();
        next.queues.remove(key);
        next
    }

    /// Number of non-empty queues across all rooms
    pub fn queue_count(&self) -> usize {
        self.queues.len()
    }

    /// Total members waiting across all queues
    pub fn total_members(&self) -> usize {
        self.queues.values().map(Vec::len).sum()
    }
}
