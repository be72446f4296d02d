//! Configuration management for the voxel relay.
//!
//! This module handles loading, validation, and conversion of relay
//! configuration from TOML files and command-line arguments.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;
use voxel_server::config::{DEFAULT_FLOOR_PALETTE, DEFAULT_PORT};
use voxel_server::world::{color::MAX_COLOR, Color, WorldDimensions, MAX_VOXELS};
use voxel_server::{SecurityConfig, ServerConfig, WorldConfig};

fn default_bind_address() -> String {
    format!("0.0.0.0:{DEFAULT_PORT}")
}

fn default_max_connections() -> usize {
    256
}

fn default_width() -> usize {
    20
}

fn default_depth() -> usize {
    20
}

fn default_height() -> usize {
    64
}

fn default_spawn_height() -> f64 {
    6.0
}

fn default_floor_palette() -> Vec<u32> {
    DEFAULT_FLOOR_PALETTE.to_vec()
}

fn default_max_message_size() -> usize {
    4 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Application configuration loaded from TOML file.
///
/// Every section and field falls back to its default when missing, so a
/// partial file only needs to name what it changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Network settings
    #[serde(default)]
    pub server: ServerSettings,
    /// Shape and initial contents of the world
    #[serde(default)]
    pub world: WorldSettings,
    /// Inbound message limits
    #[serde(default)]
    pub security: SecuritySettings,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Server-specific configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Network address to bind the server to (e.g., "0.0.0.0:6745")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Maximum number of concurrent sessions
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

/// World dimensions and ground layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSettings {
    #[serde(default = "default_width")]
    pub width: usize,
    #[serde(default = "default_depth")]
    pub depth: usize,
    #[serde(default = "default_height")]
    pub height: usize,
    /// Height new sessions spawn at
    #[serde(default = "default_spawn_height")]
    pub spawn_height: f64,
    /// Ground layer colors as 24-bit RGB integers, bottom layer first
    #[serde(default = "default_floor_palette")]
    pub floor_palette: Vec<u32>,
}

/// Limits on inbound frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecuritySettings {
    /// Largest accepted text frame in bytes
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

/// Logging configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            max_connections: default_max_connections(),
        }
    }
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            width: default_width(),
            depth: default_depth(),
            height: default_height(),
            spawn_height: default_spawn_height(),
            floor_palette: default_floor_palette(),
        }
    }
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            max_message_size: default_max_message_size(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, creates a default configuration file at the
    /// specified path and returns the default configuration.
    pub async fn load_from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            // Create default config file
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Converts the application configuration to the relay library's
    /// [`ServerConfig`].
    pub fn to_server_config(&self) -> Result<ServerConfig, Box<dyn std::error::Error>> {
        let floor_palette = self
            .world
            .floor_palette
            .iter()
            .map(|rgb| Color::try_from(*rgb))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ServerConfig {
            bind_address: self.server.bind_address.parse()?,
            world: WorldConfig {
                width: self.world.width,
                depth: self.world.depth,
                height: self.world.height,
                spawn_height: self.world.spawn_height,
                floor_palette,
            },
            max_connections: self.server.max_connections,
            security: SecurityConfig {
                max_message_size: self.security.max_message_size,
            },
        })
    }

    /// Validates the configuration for common errors.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is valid, or an error string describing the issue.
    pub fn validate(&self) -> Result<(), String> {
        // Validate bind address
        if self.server.bind_address.parse::<std::net::SocketAddr>().is_err() {
            return Err(format!(
                "Invalid bind address: {}",
                &self.server.bind_address
            ));
        }

        if self.server.max_connections == 0 {
            return Err("server.max_connections must be greater than 0".to_string());
        }

        // Validate world shape
        if self.world.width == 0 || self.world.depth == 0 || self.world.height == 0 {
            return Err(format!(
                "World dimensions must be non-zero, got {}x{}x{}",
                self.world.width, self.world.depth, self.world.height
            ));
        }

        let dimensions = WorldDimensions {
            width: self.world.width,
            depth: self.world.depth,
            height: self.world.height,
        };
        match dimensions.checked_volume() {
            Some(volume) if volume <= MAX_VOXELS => {}
            _ => {
                return Err(format!(
                    "World {}x{}x{} exceeds the limit of {} voxels",
                    self.world.width, self.world.depth, self.world.height, MAX_VOXELS
                ));
            }
        }

        if self.world.floor_palette.len() > self.world.height {
            return Err(format!(
                "world.floor_palette has {} layers but the world is only {} high",
                self.world.floor_palette.len(),
                self.world.height
            ));
        }

        if let Some(rgb) = self.world.floor_palette.iter().find(|rgb| **rgb > MAX_COLOR) {
            return Err(format!("Invalid floor color {rgb:#x}: must be at most {MAX_COLOR:#x}"));
        }

        if !self.world.spawn_height.is_finite() {
            return Err("world.spawn_height must be a finite number".to_string());
        }

        if self.security.max_message_size == 0 {
            return Err("security.max_message_size must be greater than 0".to_string());
        }

        // Validate log level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }
}
