//! Server configuration types and defaults.
//!
//! This module contains the server configuration structure and default values
//! used to initialize the relay: where to listen, the shape of the world and
//! the limits applied to inbound traffic.

use crate::world::Color;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Default listen port of the reference deployment.
pub const DEFAULT_PORT: u16 = 6745;

/// Colors of the pre-filled ground layers, bottom (`y = 0`) first.
pub const DEFAULT_FLOOR_PALETTE: [u32; 5] = [0x280e02, 0x3a1301, 0x421602, 0x511a01, 0x329333];

/// Configuration structure for the voxel server.
///
/// Contains all parameters needed to bring up the relay: the network binding,
/// the world shape, the session limit and inbound message limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The socket address to bind the server to
    pub bind_address: SocketAddr,

    /// Shape and initial contents of the shared world
    pub world: WorldConfig,

    /// Maximum number of concurrently connected sessions
    pub max_connections: usize,

    /// Inbound message limits
    pub security: SecurityConfig,
}

/// Shape and initial contents of the voxel world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Extent along the x axis
    pub width: usize,

    /// Extent along the z axis
    pub depth: usize,

    /// Extent along the y (vertical) axis
    pub height: usize,

    /// Height at which new sessions spawn
    pub spawn_height: f64,

    /// Ground layer colors, bottom first
    pub floor_palette: Vec<Color>,
}

/// Limits applied to inbound client messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Maximum accepted text frame size in bytes
    pub max_message_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            world: WorldConfig::default(),
            max_connections: 256,
            security: SecurityConfig::default(),
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 20,
            depth: 20,
            height: 64,
            spawn_height: 6.0,
            floor_palette: DEFAULT_FLOOR_PALETTE
                .iter()
                .filter_map(|rgb| Color::new(*rgb))
                .collect(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_message_size: 4 * 1024,
        }
    }
}
