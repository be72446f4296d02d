//! Tracing subscriber setup and the startup banner.

use crate::config::LoggingSettings;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter for the configured level. A set `RUST_LOG` wins.
fn level_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Installs the global subscriber.
///
/// Output is JSON when either `force_json` (the `--json-logs` flag) or the
/// file's `json_format` asks for it, human-readable otherwise. Both formats
/// carry thread ids and names since every session runs its own task pair.
///
/// Fails if a global subscriber is already installed.
pub fn setup_logging(
    config: &LoggingSettings,
    force_json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let json = force_json || config.json_format;
    let layer = fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(true)
        .with_thread_names(true);

    let registry = tracing_subscriber::registry().with(level_filter(&config.level));
    if json {
        registry.with(layer.json()).try_init()?;
    } else {
        registry.with(layer.with_ansi(true)).try_init()?;
    }

    info!("🔧 Logging initialized at {} ({})", config.level, if json { "json" } else { "text" });
    Ok(())
}

pub fn display_banner() {
    let version = env!("CARGO_PKG_VERSION");
    info!("╔══════════════════════════════════════════╗");
    info!("║            🧱 VOXEL RELAY 🧱             ║");
    info!("║                 v{:<8}                ║", version);
    info!("║                                          ║");
    info!("║  🌍 One shared block world               ║");
    info!("║  📡 JSON events over WebSocket           ║");
    info!("║                                          ║");
    info!("╚══════════════════════════════════════════╝");
}
