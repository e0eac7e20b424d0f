//! Outbound notice seam between the core and the chat transport
//!
//! The core never calls a send primitive directly; it yields [`Notice`]
//! values through this trait and the transport delivers them.

use crate::error::Result;
use crate::types::Notice;
use async_trait::async_trait;

/// Trait for delivering queue notices to a room
#[async_trait]
pub trait NoticePublisher: Send + Sync {
    /// Deliver a notice to its room
    async fn publish_notice(&self, notice: Notice) -> Result<()>;
}
