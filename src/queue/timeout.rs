//! Per-queue inactivity timers
//!
//! The registry owns at most one pending expiry timer per queue key.
//! Arming a key always cancels whatever was pending for it, so timers
//! supersede rather than stack. Timers are tokio tasks parked on
//! `tokio::time::sleep`; cancellation is a task abort.

use crate::error::{QueueError, Result};
use crate::types::QueueKey;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

struct TimerEntry {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Registry of pending expiry timers, one per queue key.
///
/// Each armed timer carries a generation number. A fired timer only
/// removes the registry entry that still carries its own generation, so a
/// timer that was superseded while already past its sleep cannot clobber
/// its replacement. The entry is removed before the expiry callback runs,
/// which makes re-entrant `arm`/`clear` calls from inside the callback
/// safe.
#[derive(Default)]
pub struct TimeoutRegistry {
    timers: Arc<Mutex<HashMap<QueueKey, TimerEntry>>>,
    next_generation: AtomicU64,
}

impl TimeoutRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel any pending timer for the key; safe to call when none pending
    pub fn clear(&self, key: &QueueKey) {
        if let Ok(mut timers) = self.timers.lock() {
            if let Some(entry) = timers.remove(key) {
                entry.handle.abort();
                debug!("Cleared pending timer for {}", key);
            }
        }
    }

    /// Schedule `on_expire` to run once after `delay`, superseding any
    /// timer already pending for the key.
    ///
    /// A zero delay is rejected: the inactivity window comes from validated
    /// configuration and is always positive, so a zero here is a caller
    /// bug, not a request for immediate expiry.
    pub fn arm<F>(&self, key: QueueKey, delay: Duration, on_expire: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if delay.is_zero() {
            return Err(QueueError::InvalidTimeout {
                reason: format!("Cannot arm a zero-delay timer for {}", key),
            }
            .into());
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let timers = Arc::clone(&self.timers);
        let task_key = key.clone();

        // Holding the map lock across the spawn+insert keeps the fired
        // task from observing the map before its own entry exists. The
        // lock is never held across an await.
        let mut guard = self.timers.lock().map_err(|_| QueueError::InternalError {
            message: "Failed to acquire timer registry lock".to_string(),
        })?;

        if let Some(previous) = guard.remove(&key) {
            previous.handle.abort();
            debug!("Superseding pending timer for {}", key);
        }

        // Anchor the deadline at arm time, not at the task's first poll,
        // so scheduler latency cannot stretch the inactivity window.
        let deadline = tokio::time::Instant::now() + delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;

            // Forget the timer before running the callback, and only if it
            // is still ours; a superseding arm may have won the race.
            {
                let Ok(mut timers) = timers.lock() else {
                    warn!("Timer registry lock poisoned, dropping expiry for {}", task_key);
                    return;
                };
                let still_ours = timers
                    .get(&task_key)
                    .map(|entry| entry.generation == generation)
                    .unwrap_or(false);
                if !still_ours {
                    // A superseding arm won the race; it owns the key now.
                    return;
                }
                timers.remove(&task_key);
            }

            on_expire.await;
        });

        guard.insert(key, TimerEntry { generation, handle });
        Ok(())
    }

    /// Whether a timer is currently pending for the key
    pub fn is_armed(&self, key: &QueueKey) -> bool {
        self.timers
            .lock()
            .map(|timers| timers.contains_key(key))
            .unwrap_or(false)
    }

    /// Number of pending timers across all keys
    pub fn pending_count(&self) -> usize {
        self.timers.lock().map(|timers| timers.len()).unwrap_or(0)
    }

    /// Cancel every pending timer (shutdown path)
    pub fn clear_all(&self) {
        if let Ok(mut timers) = self.timers.lock() {
            for (_, entry) in timers.drain() {
                entry.handle.abort();
            }
        }
    }
}
