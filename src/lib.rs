//! Pickup Queue - Chat-driven matchmaking queue service
//!
//! This crate tracks per-room, per-queue membership for pickup games:
//! users join a named queue scoped to a chat room, and when enough
//! players accumulate the service announces the group and resets the
//! queue. Stale queues expire after a configurable inactivity window.

pub mod config;
pub mod error;
pub mod notify;
pub mod queue;
pub mod transport;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{QueueError, Result};
pub use types::*;

// Re-export key components
pub use notify::NoticePublisher;
pub use queue::{QueueService, QueueStore, TimeoutRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
