//! Main entry point for the pickup-queue service
//!
//! Initializes configuration and logging, wires the queue service to the
//! console transport, and runs until stdin closes or a shutdown signal
//! arrives.

use anyhow::Result;
use clap::Parser;
use pickup_queue::config::AppConfig;
use pickup_queue::queue::QueueService;
use pickup_queue::transport::{ConsoleNoticePublisher, ConsoleTransport};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

/// Pickup Queue Service - chat-driven matchmaking queues
#[derive(Parser)]
#[command(
    name = "pickup-queue",
    version,
    about = "A chat-driven matchmaking queue service for pickup games",
    long_about = "Pickup Queue tracks named, capacity-bounded player queues per chat room. \
                 Players join with /join <queue>; when a queue reaches the capacity encoded \
                 in its name the group is announced and the queue resets. Stale queues \
                 expire after a configurable inactivity window."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Default queue name override
    #[arg(long, value_name = "NAME", help = "Override the default queue name")]
    default_queue: Option<String>,

    /// Inactivity timeout override
    #[arg(
        long,
        value_name = "SECONDS",
        help = "Override the queue inactivity timeout in seconds"
    )]
    timeout_seconds: Option<u64>,

    /// Room id the console transport acts in
    #[arg(long, value_name = "ID", default_value_t = 1)]
    room: i64,

    /// Emit notices as JSON instead of plain text
    #[arg(long, help = "Emit notices as JSON objects")]
    json: bool,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (validate config and exit)
    #[arg(
        long,
        help = "Validate configuration and exit without starting service"
    )]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Load and merge configuration from environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    // Apply CLI overrides
    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    if let Some(default_queue) = &args.default_queue {
        config.queue.default_queue = default_queue.clone();
    }

    if let Some(timeout) = args.timeout_seconds {
        config.queue.inactivity_timeout_seconds = timeout;
    }

    pickup_queue::config::validate_config(&config)?;
    Ok(config)
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C) signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

/// Display startup banner with service information
fn display_startup_banner(config: &AppConfig) {
    info!("Pickup Queue Service v{}", pickup_queue::VERSION);
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!("   Default queue: {}", config.queue.default_queue);
    info!(
        "   Inactivity timeout: {}s",
        config.queue.inactivity_timeout_seconds
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration (CLI args can override environment/config file)
    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    // Initialize logging early (before any other operations)
    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    display_startup_banner(&config);

    if args.dry_run {
        info!("Configuration validation successful");
        info!("Dry run completed - exiting without starting service");
        return Ok(());
    }

    // Wire the core to the console transport
    let publisher = Arc::new(ConsoleNoticePublisher::new(args.json));
    let service = QueueService::new(publisher, config.queue.clone());
    let transport = ConsoleTransport::new(
        service.clone(),
        args.room,
        config.queue.default_queue.clone(),
    );

    info!("Pickup Queue Service is running");
    info!("Press Ctrl+C to shutdown gracefully...");

    tokio::select! {
        result = transport.run() => {
            if let Err(e) = result {
                error!("Transport failed: {}", e);
            }
        }
        _ = wait_for_shutdown_signal() => {
            info!("Shutdown signal received, beginning graceful shutdown...");
        }
    }

    // Cancel pending queue timers and report final state
    service.shutdown();
    if let Ok(stats) = service.get_stats() {
        info!(
            "Final stats: {} joins, {} leaves, {} games ready, {} queues expired",
            stats.joins_processed, stats.leaves_processed, stats.queues_filled, stats.queues_expired
        );
    }

    info!("Pickup Queue Service stopped");
    Ok(())
}
