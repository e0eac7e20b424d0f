//! Queue management core for the pickup-queue service
//!
//! This module holds the membership store, the per-queue inactivity
//! timers, and the join/leave/status use cases that compose them.

pub mod service;
pub mod store;
pub mod timeout;

// Re-export commonly used types
pub use service::{QueueService, QueueServiceStats};
pub use store::QueueStore;
pub use timeout::TimeoutRegistry;
