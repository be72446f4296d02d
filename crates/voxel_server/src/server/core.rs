//! Core relay server implementation.
//!
//! This module contains the main `VoxelServer` struct: it owns the shared
//! [`Relay`], binds the listener and spawns one handler task per accepted
//! connection.

use crate::{
    config::ServerConfig,
    error::ServerError,
    relay::{Relay, RelayStats},
    server::handlers::handle_connection,
    shutdown::ShutdownState,
    world::{WorldDimensions, MAX_VOXELS},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Mutex};
use tracing::{error, info, trace, warn};

/// The core relay server structure.
///
/// `VoxelServer` owns the single [`Relay`] (world grid plus session registry)
/// behind one mutex and hands a reference to every connection handler. Each
/// connect, inbound message and disconnect takes that lock for its whole
/// mutate-and-broadcast step.
pub struct VoxelServer {
    /// Server configuration settings
    config: ServerConfig,

    /// Shared world and session state
    relay: Arc<Mutex<Relay>>,

    /// Activity counters, readable without the relay lock
    stats: Arc<RelayStats>,

    /// Channel for coordinating server shutdown
    shutdown_sender: broadcast::Sender<()>,
}

impl VoxelServer {
    /// Creates a new relay server with the specified configuration.
    ///
    /// Builds the initial world from `config.world`. No socket is bound until
    /// the server is started.
    pub fn new(config: ServerConfig) -> Self {
        let stats = Arc::new(RelayStats::new());
        let relay = Arc::new(Mutex::new(Relay::new(&config, stats.clone())));
        let (shutdown_sender, _) = broadcast::channel(1);

        Self {
            config,
            relay,
            stats,
            shutdown_sender,
        }
    }

    /// Like [`VoxelServer::new`], but refuses a world too large to allocate
    /// instead of attempting it.
    pub fn try_new(config: ServerConfig) -> Result<Self, ServerError> {
        let world = &config.world;
        let dimensions = WorldDimensions {
            width: world.width,
            depth: world.depth,
            height: world.height,
        };
        match dimensions.checked_volume() {
            Some(volume) if volume <= MAX_VOXELS => Ok(Self::new(config)),
            _ => Err(ServerError::Internal(format!(
                "World {}x{}x{} exceeds the limit of {} voxels",
                world.width, world.depth, world.height, MAX_VOXELS
            ))),
        }
    }

    /// Starts the server and accepts connections until the shutdown state is
    /// flipped or [`VoxelServer::shutdown`] is called.
    pub async fn start_with_shutdown_state(&self, shutdown_state: ShutdownState) -> Result<(), ServerError> {
        self.start_internal(Some(shutdown_state)).await
    }

    /// Starts the server and accepts connections until
    /// [`VoxelServer::shutdown`] is called.
    pub async fn start(&self) -> Result<(), ServerError> {
        self.start_internal(None).await
    }

    async fn start_internal(&self, shutdown_state: Option<ShutdownState>) -> Result<(), ServerError> {
        info!("🚀 Starting voxel relay on {}", self.config.bind_address);

        let listener = TcpListener::bind(self.config.bind_address)
            .await
            .map_err(|e| ServerError::Network(format!("Failed to bind {}: {e}", self.config.bind_address)))?;

        self.serve(listener, shutdown_state).await
    }

    /// Runs the accept loop on an already bound listener.
    ///
    /// Tests bind `127.0.0.1:0` themselves and pass the listener in so they
    /// can learn the chosen port.
    pub async fn serve(
        &self,
        listener: TcpListener,
        shutdown_state: Option<ShutdownState>,
    ) -> Result<(), ServerError> {
        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::Network(format!("Listener has no local address: {e}")))?;
        {
            let relay = self.relay.lock().await;
            let dims = relay.world().dimensions();
            info!(
                "🌍 World {}x{}x{} ready, {} voxels filled",
                dims.width,
                dims.depth,
                dims.height,
                relay.world().count_filled()
            );
        }
        info!("✅ Listening on {}", local_addr);

        let mut shutdown_receiver = self.shutdown_sender.subscribe();

        loop {
            if let Some(ref shutdown_state) = shutdown_state {
                if shutdown_state.is_shutdown_initiated() {
                    info!("🛑 Accept loop stopping - shutdown initiated");
                    break;
                }
            }

            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        trace!("📥 Accepted TCP connection from {}", addr);
                        if let Err(e) = stream.set_nodelay(true) {
                            warn!("Failed to set TCP_NODELAY for {}: {}", addr, e);
                        }

                        let relay = self.relay.clone();
                        let stats = self.stats.clone();
                        let security = self.config.security.clone();

                        // Spawn individual connection handler
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, addr, relay, stats, security).await {
                                warn!("Connection error from {}: {}", addr, e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                    }
                },
                _ = shutdown_receiver.recv() => {
                    info!("Internal shutdown signal received");
                    break;
                }
            }
        }

        info!("Server stopped");
        Ok(())
    }

    /// Initiates server shutdown.
    ///
    /// Stops the accept loop. Connections that are already open keep running
    /// until their clients disconnect or the runtime shuts down.
    pub async fn shutdown(&self) -> Result<(), ServerError> {
        info!("🛑 Shutting down server...");
        let _ = self.shutdown_sender.send(());
        Ok(())
    }

    /// Gets the shared relay state.
    pub fn relay(&self) -> Arc<Mutex<Relay>> {
        self.relay.clone()
    }

    /// Gets the relay activity counters.
    pub fn stats(&self) -> Arc<RelayStats> {
        self.stats.clone()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
