//! Main application logic and lifecycle management.
//!
//! This module contains the `Application` struct that orchestrates relay
//! startup, periodic health reporting and graceful shutdown.

use crate::{
    cli::CliArgs,
    config::AppConfig,
    logging::display_banner,
    signals::{setup_signal_handlers, setup_signal_handlers_silent},
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, trace, warn};
use voxel_server::health::{HealthManager, HealthStatus};
use voxel_server::{RelayStats, ShutdownState, VoxelServer};

/// How often the monitoring task logs a health line.
const HEALTH_INTERVAL: Duration = Duration::from_secs(60);

/// How long the accept loop gets to stop before it is abandoned.
const SERVER_STOP_TIMEOUT: Duration = Duration::from_secs(8);

/// Main application struct.
///
/// Owns the merged configuration and the relay server for the lifetime of
/// the process.
pub struct Application {
    /// Loaded application configuration
    config: AppConfig,
    /// Relay server instance
    server: Arc<VoxelServer>,
}

impl Application {
    /// Creates a new application instance.
    ///
    /// # Process
    ///
    /// 1. Load configuration from file (creating default if missing)
    /// 2. Apply command-line argument overrides
    /// 3. Validate merged configuration
    /// 4. Display startup banner
    /// 5. Build the relay server and its initial world
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path).await?;

        // Apply CLI overrides
        if let Some(bind_address) = args.bind_address {
            config.server.bind_address = bind_address;
        }

        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }

        if args.json_logs {
            config.logging.json_format = true;
        }

        // Validate configuration
        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        } else {
            info!("✅ Configuration loaded and validated successfully");
        }

        display_banner();

        let server_config = config.to_server_config()?;
        let server = Arc::new(VoxelServer::try_new(server_config)?);

        info!("📂 Config: {}", args.config_path.display());

        Ok(Self { config, server })
    }

    /// Runs the relay until a termination signal arrives, then shuts down.
    ///
    /// A second signal during shutdown exits the process immediately.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!("🌟 Starting Voxel Relay Application");

        self.log_configuration_summary();

        let stats = self.server.stats();

        // Create shutdown state for coordinated shutdown
        let shutdown_state = ShutdownState::new();

        // Start server in background
        let server_handle = {
            let server = self.server.clone();
            let shutdown_state = shutdown_state.clone();
            tokio::spawn(async move {
                match server.start_with_shutdown_state(shutdown_state).await {
                    Ok(()) => {
                        info!("✅ Server completed successfully");
                    }
                    Err(e) => {
                        error!("❌ Server error: {}", e);
                        std::process::exit(1);
                    }
                }
            })
        };

        // Start monitoring task for periodic health reports
        let monitoring_handle = {
            let server = self.server.clone();

            tokio::spawn(async move {
                let health_manager = HealthManager::new();
                let mut interval = tokio::time::interval(HEALTH_INTERVAL);
                let mut last_events_broadcast = 0u64;

                // The first tick fires immediately.
                interval.tick().await;

                loop {
                    interval.tick().await;

                    let health = health_manager.perform_health_check(&server).await;
                    let events_this_period = health.relay.events_broadcast - last_events_broadcast;
                    last_events_broadcast = health.relay.events_broadcast;

                    info!(
                        "📊 Relay Health - {:?} | {}/{} sessions | {} events/min | {} voxels | {}MB",
                        health.status,
                        health.live_sessions,
                        health.max_connections,
                        events_this_period,
                        health.filled_voxels,
                        health.memory_usage_mb
                    );

                    if health.status != HealthStatus::Healthy {
                        for warning in &health.warnings {
                            warn!("⚠️ {}", warning);
                        }
                        for problem in &health.errors {
                            error!("❗ {}", problem);
                        }
                    }

                    if !health_manager.readiness_check(&server).await {
                        warn!("🚫 New sessions are being refused until a slot frees up");
                    }

                    if tracing::enabled!(tracing::Level::TRACE) {
                        trace!(
                            "📈 Metrics:\n{}",
                            health_manager.get_prometheus_metrics(&server).await
                        );
                    }
                }
            })
        };

        info!("✅ Voxel Relay is now running!");
        info!("🎮 Ready to accept connections on {}", self.config.server.bind_address);
        info!("🔍 Health monitoring active - report every {}s", HEALTH_INTERVAL.as_secs());
        info!("🛑 Press Ctrl+C to gracefully shutdown");

        // Wait for shutdown signal
        let signal_shutdown_state = setup_signal_handlers().await?;

        // merciless shutdown
        tokio::spawn(async move {
            if let Err(e) = setup_signal_handlers_silent().await {
                error!("Failed to set up merciless shutdown signal handler: {e}");
                return;
            }

            warn!("Shutdown handler received again! I'll make this quick.");
            std::process::exit(1);
        });

        if signal_shutdown_state.is_shutdown_initiated() {
            shutdown_state.initiate_shutdown();
        }

        info!("🛑 Shutdown signal received, beginning graceful shutdown...");

        // Phase 1: stop accepting sessions
        info!("📡 Phase 1: Stopping the accept loop...");
        monitoring_handle.abort();
        self.server.shutdown().await?;

        match tokio::time::timeout(SERVER_STOP_TIMEOUT, server_handle).await {
            Ok(_) => info!("✅ Accept loop stopped"),
            Err(_) => warn!("⏰ Accept loop did not stop within timeout, proceeding with cleanup"),
        }

        // Phase 2: report what is left behind
        let live = stats.live_sessions();
        if live > 0 {
            info!("⏳ Phase 2: {} session(s) still connected will be dropped", live);
        } else {
            info!("✅ Phase 2: No sessions connected");
        }
        shutdown_state.complete_shutdown();

        log_final_statistics(&stats);

        info!("✅ Voxel Relay shutdown complete");
        Ok(())
    }

    /// Logs the configuration summary at startup.
    fn log_configuration_summary(&self) {
        info!("📋 Configuration Summary:");
        info!("  🌐 Bind address: {}", self.config.server.bind_address);
        info!(
            "  🌍 World: {}x{}x{} ({} floor layers)",
            self.config.world.width,
            self.config.world.depth,
            self.config.world.height,
            self.config.world.floor_palette.len()
        );
        info!("  👥 Max connections: {}", self.config.server.max_connections);
        info!("  📦 Max message size: {} bytes", self.config.security.max_message_size);
    }
}

/// Logs final statistics during shutdown.
fn log_final_statistics(stats: &RelayStats) {
    let snapshot = stats.snapshot();
    info!("📊 Final Statistics:");
    info!("  - Uptime: {}s", snapshot.uptime_seconds);
    info!(
        "  - Sessions: {} opened, {} closed, {} refused",
        snapshot.sessions_opened, snapshot.sessions_closed, snapshot.sessions_refused
    );
    info!(
        "  - Messages: {} applied, {} ignored, {} rejected",
        snapshot.messages_applied, snapshot.messages_ignored, snapshot.messages_rejected
    );
    info!("  - Events delivered: {}", snapshot.events_broadcast);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args_for(dir: &TempDir) -> CliArgs {
        CliArgs {
            config_path: dir.path().join("config.toml"),
            bind_address: None,
            log_level: None,
            json_logs: false,
        }
    }

    #[tokio::test]
    async fn test_application_creation_writes_default_config() {
        let dir = TempDir::new().expect("temp dir");
        let args = args_for(&dir);
        let path = args.config_path.clone();

        let app = Application::new(args).await.expect("application starts");
        assert!(path.exists());
        assert_eq!(app.server.config().bind_address.port(), 6745);
    }

    #[tokio::test]
    async fn test_cli_overrides_config_file() {
        let dir = TempDir::new().expect("temp dir");
        let mut args = args_for(&dir);
        args.bind_address = Some("127.0.0.1:9999".to_string());
        args.log_level = Some("debug".to_string());
        args.json_logs = true;

        let app = Application::new(args).await.expect("application starts");
        assert_eq!(app.config.server.bind_address, "127.0.0.1:9999");
        assert_eq!(app.config.logging.level, "debug");
        assert!(app.config.logging.json_format);
        assert_eq!(app.server.config().bind_address.port(), 9999);
    }

    #[tokio::test]
    async fn test_invalid_override_is_rejected() {
        let dir = TempDir::new().expect("temp dir");
        let mut args = args_for(&dir);
        args.log_level = Some("loud".to_string());

        assert!(Application::new(args).await.is_err());
    }
}
