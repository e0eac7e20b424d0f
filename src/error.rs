//! Error types for the queue service
//!
//! This module defines all error types using anyhow for consistent error
//! handling throughout the application.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific queue-management scenarios
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Invalid timeout: {reason}")]
    InvalidTimeout { reason: String },

    #[error("Notice delivery failed: {message}")]
    NoticeDeliveryFailed { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}
