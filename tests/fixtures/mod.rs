//! Test fixtures and mock implementations for integration testing

use async_trait::async_trait;
use pickup_queue::error::Result;
use pickup_queue::notify::NoticePublisher;
use pickup_queue::types::{Notice, RoomId};
use std::sync::{Arc, Mutex};

/// Mock notice publisher that captures published notices for testing
#[derive(Debug, Default)]
pub struct MockNoticePublisher {
    published_notices: Arc<Mutex<Vec<Notice>>>,
}

impl MockNoticePublisher {
    pub fn new() -> Self {
        Self {
            published_notices: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Get all published notices (for testing)
    pub fn get_published_notices(&self) -> Vec<Notice> {
        self.published_notices
            .lock()
            .map(|notices| notices.clone())
            .unwrap_or_default()
    }

    /// Notice texts in publication order
    pub fn texts(&self) -> Vec<String> {
        self.get_published_notices()
            .into_iter()
            .map(|n| n.text)
            .collect()
    }

    /// Notice texts addressed to one room
    pub fn texts_for_room(&self, room_id: RoomId) -> Vec<String> {
        self.get_published_notices()
            .into_iter()
            .filter(|n| n.room_id == room_id)
            .map(|n| n.text)
            .collect()
    }

    /// Count notices whose text contains the given fragment
    pub fn count_containing(&self, fragment: &str) -> usize {
        self.texts().iter().filter(|t| t.contains(fragment)).count()
    }
}

#[async_trait]
impl NoticePublisher for MockNoticePublisher {
    async fn publish_notice(&self, notice: Notice) -> Result<()> {
        if let Ok(mut notices) = self.published_notices.lock() {
            notices.push(notice);
        }
        Ok(())
    }
}
