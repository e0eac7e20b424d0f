//! Main application configuration
//!
//! This module defines the primary configuration structures for the
//! pickup-queue service, including environment variable loading, TOML
//! file loading, and validation.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub queue: QueueSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Queue-management settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    /// Queue name used when a command does not name one
    pub default_queue: String,
    /// Inactivity window after which a non-empty queue expires, in seconds
    pub inactivity_timeout_seconds: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "pickup-queue".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            default_queue: "5v5".to_string(),
            inactivity_timeout_seconds: 3600, // 1 hour
        }
    }
}

impl QueueSettings {
    /// Get the inactivity window as a Duration
    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_seconds)
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            config.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.service.log_level = log_level;
        }

        // Queue settings
        if let Ok(queue) = env::var("DEFAULT_QUEUE") {
            config.queue.default_queue = queue;
        }
        if let Ok(timeout) = env::var("INACTIVITY_TIMEOUT_SECONDS") {
            config.queue.inactivity_timeout_seconds = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid INACTIVITY_TIMEOUT_SECONDS value: {}", timeout))?;
        }

        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file, then validate
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        validate_config(&config)?;
        Ok(config)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    // Validate queue settings
    if config.queue.default_queue.trim().is_empty() {
        return Err(anyhow!("Default queue name cannot be empty"));
    }
    if config.queue.inactivity_timeout_seconds == 0 {
        return Err(anyhow!("Inactivity timeout must be greater than 0"));
    }

    Ok(())
}
