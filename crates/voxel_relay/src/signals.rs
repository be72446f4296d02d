//! Termination signals.
//!
//! The application waits on [`setup_signal_handlers`] once to begin a
//! graceful shutdown, then on [`setup_signal_handlers_silent`] in the
//! background so a second signal can cut the shutdown short.

use tokio::signal;
use tracing::info;
use voxel_server::ShutdownState;

/// Resolves with the name of the first termination signal received.
#[cfg(unix)]
async fn wait_for_termination() -> std::io::Result<&'static str> {
    use signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    let name = tokio::select! {
        _ = sigint.recv() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
    };
    Ok(name)
}

#[cfg(not(unix))]
async fn wait_for_termination() -> std::io::Result<&'static str> {
    signal::ctrl_c().await?;
    Ok("Ctrl+C")
}

/// Waits for SIGINT/SIGTERM (Ctrl+C off Unix) and returns a shutdown state
/// that is already initiated.
pub async fn setup_signal_handlers() -> Result<ShutdownState, Box<dyn std::error::Error>> {
    let name = wait_for_termination().await?;
    info!("📡 Received {} - initiating graceful shutdown", name);

    let shutdown_state = ShutdownState::new();
    shutdown_state.initiate_shutdown();
    Ok(shutdown_state)
}

/// Like [`setup_signal_handlers`] but logs nothing.
pub async fn setup_signal_handlers_silent() -> Result<ShutdownState, Box<dyn std::error::Error>> {
    wait_for_termination().await?;

    let shutdown_state = ShutdownState::new();
    shutdown_state.initiate_shutdown();
    Ok(shutdown_state)
}
