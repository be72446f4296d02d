//! # Voxel Server - Multiplayer Block World Relay
//!
//! An authoritative relay for a small shared voxel world. Clients connect over
//! WebSocket, receive a snapshot of the world and of every other connected
//! player, then stream their moves, color changes and block edits. The relay
//! validates each edit, applies it to the single shared grid and broadcasts
//! the result to everyone.
//!
//! ## Architecture Overview
//!
//! * **World** ([`world`]) - dense bounds-checked voxel grid; the bottom layer
//!   is protected
//! * **Connection** ([`connection`]) - per-client sessions and the slot
//!   registry that hands out reusable ids
//! * **Relay** ([`relay`]) - the session protocol, event fan-out and activity
//!   counters
//! * **Messaging** ([`messaging`]) - JSON wire messages keyed by `action`
//! * **Server** ([`server`]) - accept loop and per-connection reader/writer
//!   tasks
//!
//! ### Message Flow
//!
//! 1. Client sends a text frame such as `{"action":"place","x":3,"y":6,"z":10}`
//! 2. The connection handler validates and decodes it into a [`ClientMessage`]
//! 3. The relay lock is taken, the change is applied and the resulting event
//!    is queued for every session
//! 4. Each session's writer task serializes the event and sends it
//!
//! ## Thread Safety
//!
//! All shared state lives in one [`Relay`] behind a `tokio::sync::Mutex`.
//! Every connect, inbound message and disconnect holds the lock for its whole
//! mutate-and-broadcast step, so all sessions observe events in the same
//! order. Broadcasting only pushes onto unbounded per-session queues and
//! never waits on a socket.
//!
//! ## Error Handling
//!
//! * [`ServerError`] - startup and transport failures
//! * [`RelayError`] - refused connections
//! * [`security::SecurityError`] - malformed or oversized frames, which are
//!   dropped without a reply

// Re-export core types and functions for easy access
pub use config::{SecurityConfig, ServerConfig, WorldConfig};
pub use error::{RelayError, ServerError};
pub use messaging::{ClientMessage, ServerMessage};
pub use relay::{Relay, RelayStats, StatsSnapshot};
pub use server::VoxelServer;
pub use shutdown::ShutdownState;
pub use utils::{create_server, create_server_with_config};

// Public module declarations
pub mod config;
pub mod connection;
pub mod error;
pub mod health;
pub mod messaging;
pub mod relay;
pub mod security;
pub mod server;
pub mod shutdown;
pub mod utils;
pub mod world;
