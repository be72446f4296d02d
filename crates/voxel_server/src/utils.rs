//! Utility functions and helper methods for the relay server.
//!
//! This module provides convenient factory functions for creating server
//! instances with different configurations.

use crate::{config::ServerConfig, server::VoxelServer};

/// Creates a new relay server with default configuration.
///
/// Listens on `0.0.0.0:6745` with a 20×20×64 world once started.
///
/// # Example
///
/// ```rust
/// use voxel_server::create_server;
///
/// let server = create_server();
/// assert_eq!(server.config().bind_address.port(), 6745);
/// ```
pub fn create_server() -> VoxelServer {
    VoxelServer::new(ServerConfig::default())
}

/// Creates a new relay server with custom configuration.
///
/// # Example
///
/// ```rust
/// use voxel_server::{create_server_with_config, ServerConfig};
///
/// let config = ServerConfig {
///     bind_address: "127.0.0.1:9000".parse().unwrap(),
///     max_connections: 32,
///     ..Default::default()
/// };
///
/// let server = create_server_with_config(config);
/// assert_eq!(server.config().max_connections, 32);
/// ```
pub fn create_server_with_config(config: ServerConfig) -> VoxelServer {
    VoxelServer::new(config)
}
