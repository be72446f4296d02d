//! # Voxel Relay - Main Entry Point
//!
//! Runs the voxel world relay as a standalone process. This crate handles CLI
//! parsing, configuration loading, logging setup and the application
//! lifecycle; the relay itself lives in `voxel_server`.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration
//! voxel-relay
//!
//! # Specify custom configuration
//! voxel-relay --config production.toml
//!
//! # Override specific settings
//! voxel-relay --bind 0.0.0.0:8080 --log-level debug
//!
//! # JSON logging for production
//! voxel-relay --json-logs
//! ```
//!
//! ## Configuration
//!
//! The relay loads configuration from a TOML file (default: `config.toml`).
//! If the file doesn't exist, a default configuration will be created.
//!
//! ## Signal Handling
//!
//! The relay shuts down gracefully on SIGINT (Ctrl+C) and SIGTERM. A second
//! signal exits immediately.

use tracing::error;

pub mod app;
pub mod cli;
pub mod config;
pub mod logging;
pub mod signals;

use app::Application;
use cli::CliArgs;
use config::AppConfig;

/// Runs the relay application.
///
/// # Exit Codes
///
/// * **0**: Successful execution and shutdown
/// * **1**: Error during startup, configuration, or runtime
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    // Parse CLI arguments first
    let args = CliArgs::parse();

    // Load configuration to get logging settings
    let mut logging = AppConfig::load_from_file(&args.config_path)
        .await
        .unwrap_or_default()
        .logging;
    if let Some(level) = &args.log_level {
        logging.level = level.clone();
    }

    // Setup logging before anything else
    if let Err(e) = logging::setup_logging(&logging, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }

    // Create and run application
    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {e:?}");
            std::process::exit(1);
        }
    }

    Ok(())
}

// Re-export main types for potential library usage
pub use config::{LoggingSettings, SecuritySettings, ServerSettings, WorldSettings};
