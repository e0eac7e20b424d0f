//! Join/leave/status use cases over the membership store
//!
//! This module composes the immutable [`QueueStore`] with the
//! [`TimeoutRegistry`] and decides when a queue is full and must reset,
//! when it expires, and what notice text each transition emits.

use crate::config::QueueSettings;
use crate::error::{QueueError, Result};
use crate::notify::NoticePublisher;
use crate::queue::store::QueueStore;
use crate::queue::timeout::TimeoutRegistry;
use crate::types::{InboundEvent, Member, Notice, QueueKey, RoomId, UserId};
use crate::utils::{current_timestamp, format_roster, queue_capacity};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// Statistics about queue service operations
#[derive(Debug, Clone, Default)]
pub struct QueueServiceStats {
    /// Total join commands processed
    pub joins_processed: u64,
    /// Total leave commands processed
    pub leaves_processed: u64,
    /// Total status commands processed
    pub status_requests: u64,
    /// Queues that reached capacity and announced a ready game
    pub queues_filled: u64,
    /// Queues reset by the inactivity timer
    pub queues_expired: u64,
    /// Current number of non-empty queues
    pub active_queues: usize,
    /// Current number of players waiting across all queues
    pub players_waiting: usize,
}

/// The queue service: one instance serves every room and queue.
///
/// Cloning is cheap; clones share the same store, timers, and publisher,
/// which lets expiry tasks capture the service they report back through.
///
/// Every state transition decides its outcome inside a single store
/// write-lock critical section (never held across an await), so commands
/// and expiry tasks running on a multi-threaded runtime serialize into
/// run-to-completion transitions and can never observe or produce a
/// half-applied state. Timer registry operations nest inside the store
/// lock, never the other way around.
#[derive(Clone)]
pub struct QueueService {
    /// Current membership snapshot; mutations swap in a new snapshot
    store: Arc<RwLock<QueueStore>>,
    /// Pending inactivity timers, one per queue key
    timeouts: Arc<TimeoutRegistry>,
    /// Outbound notice delivery
    publisher: Arc<dyn NoticePublisher>,
    /// Default queue name and inactivity window
    settings: QueueSettings,
    /// Operation counters
    stats: Arc<RwLock<QueueServiceStats>>,
}

impl QueueService {
    /// Create a new queue service with an empty store
    pub fn new(publisher: Arc<dyn NoticePublisher>, settings: QueueSettings) -> Self {
        Self {
            store: Arc::new(RwLock::new(QueueStore::new())),
            timeouts: Arc::new(TimeoutRegistry::new()),
            publisher,
            settings,
            stats: Arc::new(RwLock::new(QueueServiceStats::default())),
        }
    }

    /// Dispatch an inbound command event from the transport
    pub async fn handle_event(&self, event: InboundEvent) -> Result<()> {
        let queued_ms = (current_timestamp() - event.timestamp).num_milliseconds();
        debug!(
            "Handling {} for {} from user {} (queued {}ms)",
            event.command,
            QueueKey::new(event.room_id, event.queue_name.clone()),
            event.user_id,
            queued_ms
        );

        match event.command {
            crate::types::CommandKind::Join => {
                self.join(
                    event.room_id,
                    &event.queue_name,
                    event.user_id,
                    &event.display_name,
                )
                .await
            }
            crate::types::CommandKind::Leave => {
                self.leave(event.room_id, &event.queue_name, event.user_id)
                    .await
            }
            crate::types::CommandKind::Status => {
                self.status(event.room_id, &event.queue_name).await
            }
        }
    }

    /// Add a user to a queue, announcing the game when it fills.
    ///
    /// A repeat join by the same user refreshes the display name without
    /// growing the queue. Any join rearms the queue's inactivity timer; a
    /// fill clears it.
    pub async fn join(
        &self,
        room_id: RoomId,
        queue_name: &str,
        user_id: UserId,
        display_name: &str,
    ) -> Result<()> {
        // An event without a user is malformed; drop it silently.
        if display_name.trim().is_empty() {
            debug!("Ignoring join with no user for queue '{}'", queue_name);
            return Ok(());
        }

        let key = QueueKey::new(room_id, queue_name);
        let capacity = queue_capacity(queue_name);

        // Upsert, count check, and the conditional reset happen in one
        // critical section; only the publish waits until after release.
        let (text, filled, count) = {
            let mut store = self.write_store()?;
            *store = store.upsert_member(&key, Member::new(user_id, display_name));
            let members = store.members(&key).to_vec();
            let count = members.len();

            if count >= capacity {
                self.timeouts.clear(&key);
                *store = store.reset_queue(&key);
                let text = format!("Game ready! {}", format_roster(&members, false));
                (text, true, count)
            } else {
                self.rearm_expiry(key.clone())?;
                (status_text(&key.queue_name, &members, capacity), false, count)
            }
        };

        {
            let mut stats = self.write_stats()?;
            stats.joins_processed += 1;
            if filled {
                stats.queues_filled += 1;
            }
        }

        if filled {
            info!("Queue {} is ready with {} players", key, count);
        } else {
            info!("Queue {} now at {}/{}", key, count, capacity);
        }
        self.publish(Notice::new(room_id, text)).await
    }

    /// Remove a user from a queue and report the new status.
    ///
    /// Leaving a queue one is not in is a defined no-op, not an error.
    /// Leaving deliberately does not rearm or clear the inactivity timer;
    /// see the service tests where this behavior is pinned down.
    pub async fn leave(&self, room_id: RoomId, queue_name: &str, user_id: UserId) -> Result<()> {
        let key = QueueKey::new(room_id, queue_name);

        let text = {
            let mut store = self.write_store()?;
            *store = store.remove_member(&key, user_id);
            status_text(&key.queue_name, store.members(&key), queue_capacity(queue_name))
        };
        {
            let mut stats = self.write_stats()?;
            stats.leaves_processed += 1;
        }

        debug!("User {} left queue {}", user_id, key);
        self.publish(Notice::new(room_id, text)).await
    }

    /// Report a queue's status without changing any state
    pub async fn status(&self, room_id: RoomId, queue_name: &str) -> Result<()> {
        let key = QueueKey::new(room_id, queue_name);

        let text = {
            let store = self.read_store()?;
            status_text(&key.queue_name, store.members(&key), queue_capacity(queue_name))
        };
        {
            let mut stats = self.write_stats()?;
            stats.status_requests += 1;
        }

        self.publish(Notice::new(room_id, text)).await
    }

    /// Expiry handler: reset a stale queue and notify the room.
    ///
    /// Runs from a timer task, so failures are logged rather than
    /// propagated. The count read and the reset share one write lock; a
    /// key that was rearmed after this timer fired (a command slipped in
    /// between) is left alone, since that activity supersedes the expiry.
    async fn expire(&self, key: QueueKey) {
        let text = {
            let Ok(mut store) = self.store.write() else {
                warn!("Store lock poisoned, skipping expiry for {}", key);
                return;
            };

            if self.timeouts.is_armed(&key) {
                debug!("Queue {} saw activity after its timer fired, leaving it alone", key);
                return;
            }

            let count = store.member_count(&key);
            *store = store.reset_queue(&key);

            if count == 0 {
                debug!("Expiry fired for already-empty queue {}", key);
                return;
            }

            info!("Queue {} expired with {} players waiting", key, count);
            format!("{} timed out after inactivity.", key.queue_name)
        };

        if let Ok(mut stats) = self.stats.write() {
            stats.queues_expired += 1;
        }

        if let Err(e) = self.publish(Notice::new(key.room_id, text)).await {
            warn!("Failed to deliver expiry notice for {}: {}", key, e);
        }
    }

    /// Restart the inactivity window for a queue
    fn rearm_expiry(&self, key: QueueKey) -> Result<()> {
        let service = self.clone();
        let expire_key = key.clone();
        self.timeouts
            .arm(key, self.settings.inactivity_timeout(), async move {
                service.expire(expire_key).await;
            })
    }

    /// Deliver a notice, naming transport failures as delivery errors
    async fn publish(&self, notice: Notice) -> Result<()> {
        self.publisher.publish_notice(notice).await.map_err(|e| {
            QueueError::NoticeDeliveryFailed {
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Members of a queue in insertion order
    pub fn members(&self, room_id: RoomId, queue_name: &str) -> Result<Vec<Member>> {
        let key = QueueKey::new(room_id, queue_name);
        Ok(self.read_store()?.members(&key).to_vec())
    }

    /// Current member count for a queue
    pub fn member_count(&self, room_id: RoomId, queue_name: &str) -> Result<usize> {
        Ok(self.members(room_id, queue_name)?.len())
    }

    /// Snapshot of the whole store (tests and diagnostics)
    pub fn snapshot(&self) -> Result<QueueStore> {
        Ok(self.read_store()?.clone())
    }

    /// The timeout registry (tests and diagnostics)
    pub fn timeouts(&self) -> &TimeoutRegistry {
        &self.timeouts
    }

    /// Current operation statistics
    pub fn get_stats(&self) -> Result<QueueServiceStats> {
        let mut stats = self
            .stats
            .read()
            .map_err(|_| QueueError::InternalError {
                message: "Failed to acquire stats lock".to_string(),
            })?
            .clone();

        let store = self.read_store()?;
        stats.active_queues = store.queue_count();
        stats.players_waiting = store.total_members();
        Ok(stats)
    }

    /// Cancel all pending timers (shutdown path)
    pub fn shutdown(&self) {
        self.timeouts.clear_all();
    }

    fn read_store(&self) -> Result<std::sync::RwLockReadGuard<'_, QueueStore>> {
        self.store.read().map_err(|_| {
            QueueError::InternalError {
                message: "Failed to acquire store lock".to_string(),
            }
            .into()
        })
    }

    fn write_store(&self) -> Result<std::sync::RwLockWriteGuard<'_, QueueStore>> {
        self.store.write().map_err(|_| {
            QueueError::InternalError {
                message: "Failed to acquire store lock".to_string(),
            }
            .into()
        })
    }

    fn write_stats(&self) -> Result<std::sync::RwLockWriteGuard<'_, QueueServiceStats>> {
        self.stats.write().map_err(|_| {
            QueueError::InternalError {
                message: "Failed to acquire stats lock".to_string(),
            }
            .into()
        })
    }
}

/// Status notice text: "n / cap added up to ..." with a de-highlighted
/// roster, or the distinct empty-queue message.
fn status_text(queue_name: &str, members: &[Member], capacity: usize) -> String {
    if members.is_empty() {
        format!("{} is empty.", queue_name)
    } else {
        format!(
            "{} / {} added up to {} ({})",
            members.len(),
            capacity,
            queue_name,
            format_roster(members, true)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::advance;

    /// Publisher that captures notices in memory
    #[derive(Default)]
    struct RecordingPublisher {
        notices: Mutex<Vec<Notice>>,
    }

    impl RecordingPublisher {
        fn texts(&self) -> Vec<String> {
            self.notices
                .lock()
                .map(|n| n.iter().map(|notice| notice.text.clone()).collect())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl NoticePublisher for RecordingPublisher {
        async fn publish_notice(&self, notice: Notice) -> Result<()> {
            if let Ok(mut notices) = self.notices.lock() {
                notices.push(notice);
            }
            Ok(())
        }
    }

    /// Publisher whose delivery always fails
    struct FailingPublisher;

    #[async_trait]
    impl NoticePublisher for FailingPublisher {
        async fn publish_notice(&self, _notice: Notice) -> Result<()> {
            Err(anyhow::anyhow!("connection reset"))
        }
    }

    fn test_service() -> (QueueService, Arc<RecordingPublisher>) {
        let publisher = Arc::new(RecordingPublisher::default());
        let settings = QueueSettings {
            default_queue: "5v5".to_string(),
            inactivity_timeout_seconds: 3600,
        };
        (QueueService::new(publisher.clone(), settings), publisher)
    }

    #[tokio::test]
    async fn test_join_reports_filling_status() {
        let (service, publisher) = test_service();

        service.join(1, "2v2", 10, "@alice").await.unwrap();

        assert_eq!(publisher.texts(), vec!["1 / 2 added up to 2v2 (alice)"]);
        assert_eq!(service.member_count(1, "2v2").unwrap(), 1);
        assert!(service.timeouts().is_armed(&QueueKey::new(1, "2v2")));
    }

    #[tokio::test]
    async fn test_queue_fills_announces_and_resets() {
        let (service, publisher) = test_service();

        service.join(1, "2v2", 10, "@alice").await.unwrap();
        service.join(1, "2v2", 11, "@bob").await.unwrap();

        let texts = publisher.texts();
        assert_eq!(texts[1], "Game ready! @alice, @bob");

        // The queue reset and its timer is gone
        assert_eq!(service.member_count(1, "2v2").unwrap(), 0);
        assert!(!service.timeouts().is_armed(&QueueKey::new(1, "2v2")));

        service.status(1, "2v2").await.unwrap();
        assert_eq!(publisher.texts()[2], "2v2 is empty.");
    }

    #[tokio::test]
    async fn test_repeat_join_updates_name_without_growing_queue() {
        let (service, _publisher) = test_service();

        service.join(1, "5v5", 10, "@alice").await.unwrap();
        service.join(1, "5v5", 10, "Alice Smith").await.unwrap();

        let members = service.members(1, "5v5").unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].display_name, "Alice Smith");
    }

    #[tokio::test]
    async fn test_leave_nonmember_is_noop_with_notice() {
        let (service, publisher) = test_service();

        let before = service.snapshot().unwrap();
        service.leave(1, "5v5", 42).await.unwrap();

        assert_eq!(before, service.snapshot().unwrap());
        assert_eq!(publisher.texts(), vec!["5v5 is empty."]);
    }

    #[tokio::test]
    async fn test_join_with_empty_display_name_ignored() {
        let (service, publisher) = test_service();

        service.join(1, "5v5", 10, "  ").await.unwrap();

        assert!(publisher.texts().is_empty());
        assert_eq!(service.member_count(1, "5v5").unwrap(), 0);
        assert!(!service.timeouts().is_armed(&QueueKey::new(1, "5v5")));
    }

    #[tokio::test]
    async fn test_queues_are_scoped_by_room() {
        let (service, _publisher) = test_service();

        service.join(1, "2v2", 10, "@alice").await.unwrap();
        service.join(2, "2v2", 10, "@alice").await.unwrap();

        // Same user, same queue name, different rooms: no fill
        assert_eq!(service.member_count(1, "2v2").unwrap(), 1);
        assert_eq!(service.member_count(2, "2v2").unwrap(), 1);
        assert_eq!(service.timeouts().pending_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_queue_expires_once() {
        let (service, publisher) = test_service();

        service.join(1, "5v5", 10, "@alice").await.unwrap();

        advance(Duration::from_secs(3601)).await;
        tokio::task::yield_now().await;

        let texts = publisher.texts();
        assert_eq!(texts.len(), 2);
        assert_eq!(texts[1], "5v5 timed out after inactivity.");
        assert_eq!(service.member_count(1, "5v5").unwrap(), 0);

        // Nothing further fires
        advance(Duration::from_secs(7200)).await;
        tokio::task::yield_now().await;
        assert_eq!(publisher.texts().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_join_rearms_the_inactivity_window() {
        let (service, publisher) = test_service();

        service.join(1, "5v5", 10, "@alice").await.unwrap();
        advance(Duration::from_secs(3000)).await;
        tokio::task::yield_now().await;

        service.join(1, "5v5", 11, "@bob").await.unwrap();
        assert_eq!(service.timeouts().pending_count(), 1);

        // Just short of the rearmed window: no expiry
        advance(Duration::from_secs(3599)).await;
        tokio::task::yield_now().await;
        assert_eq!(service.member_count(1, "5v5").unwrap(), 2);

        // Past it: expiry fires
        advance(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;
        assert_eq!(service.member_count(1, "5v5").unwrap(), 0);
        assert!(publisher
            .texts()
            .contains(&"5v5 timed out after inactivity.".to_string()));
    }

    // Pins down inherited behavior: leaving does not count as activity,
    // so the window keeps running from the last join.
    #[tokio::test(start_paused = true)]
    async fn test_leave_does_not_touch_the_inactivity_timer() {
        let (service, _publisher) = test_service();

        service.join(1, "5v5", 10, "@alice").await.unwrap();
        service.join(1, "5v5", 11, "@bob").await.unwrap();

        advance(Duration::from_secs(3000)).await;
        tokio::task::yield_now().await;

        service.leave(1, "5v5", 11).await.unwrap();
        assert!(service.timeouts().is_armed(&QueueKey::new(1, "5v5")));

        // 601s later the window from the last join elapses despite the leave
        advance(Duration::from_secs(601)).await;
        tokio::task::yield_now().await;
        assert_eq!(service.member_count(1, "5v5").unwrap(), 0);
    }

    // An expiry that fired just before a join rearmed its key must not
    // wipe out the fresh membership.
    #[tokio::test]
    async fn test_stale_expiry_after_rearm_leaves_queue_intact() {
        let (service, publisher) = test_service();

        service.join(1, "5v5", 10, "@alice").await.unwrap();
        assert!(service.timeouts().is_armed(&QueueKey::new(1, "5v5")));

        // Simulate the fired timer task arriving after the join's rearm:
        // the registry entry belongs to the newer timer, so this expiry
        // is stale and must back off.
        service.expire(QueueKey::new(1, "5v5")).await;

        assert_eq!(service.member_count(1, "5v5").unwrap(), 1);
        assert!(service.timeouts().is_armed(&QueueKey::new(1, "5v5")));
        assert!(!publisher
            .texts()
            .iter()
            .any(|t| t.contains("timed out")));
        assert_eq!(service.get_stats().unwrap().queues_expired, 0);
    }

    #[tokio::test]
    async fn test_notice_delivery_failure_is_named() {
        let publisher = Arc::new(FailingPublisher);
        let service = QueueService::new(
            publisher,
            QueueSettings {
                default_queue: "5v5".to_string(),
                inactivity_timeout_seconds: 3600,
            },
        );

        let err = service.join(1, "5v5", 10, "@alice").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<QueueError>(),
            Some(QueueError::NoticeDeliveryFailed { .. })
        ));

        // The membership change itself still landed
        assert_eq!(service.member_count(1, "5v5").unwrap(), 1);
    }

    #[tokio::test]
    async fn test_count_never_exceeds_capacity_at_rest() {
        let (service, _publisher) = test_service();

        // Mixed join/leave traffic against a capacity-3 queue
        let script: &[(i64, bool)] = &[
            (1, true),
            (2, true),
            (1, false),
            (3, true),
            (4, true), // fills with users 2, 3, 4
            (5, true),
            (6, true),
            (7, true), // fills with users 5, 6, 7
            (6, false),
            (8, true),
            (9, true),
        ];

        for &(user, is_join) in script {
            if is_join {
                service
                    .join(7, "3v3", user, &format!("@user{}", user))
                    .await
                    .unwrap();
            } else {
                service.leave(7, "3v3", user).await.unwrap();
            }
            assert!(service.member_count(7, "3v3").unwrap() < 3);
        }
    }

    #[tokio::test]
    async fn test_stats_track_operations() {
        let (service, _publisher) = test_service();

        service.join(1, "2v2", 10, "@alice").await.unwrap();
        service.join(1, "2v2", 11, "@bob").await.unwrap(); // fills
        service.join(1, "5v5", 12, "@carol").await.unwrap();
        service.leave(1, "5v5", 99).await.unwrap();
        service.status(1, "5v5").await.unwrap();

        let stats = service.get_stats().unwrap();
        assert_eq!(stats.joins_processed, 3);
        assert_eq!(stats.leaves_processed, 1);
        assert_eq!(stats.status_requests, 1);
        assert_eq!(stats.queues_filled, 1);
        assert_eq!(stats.active_queues, 1);
        assert_eq!(stats.players_waiting, 1);
    }
}
