//! Message handling and routing for client-relay communication.
//!
//! This module defines the JSON wire messages and routes decoded client
//! messages into the relay.

pub mod router;
pub mod types;

pub use router::route_client_message;
pub use types::{BlockCoords, ClientMessage, PlayerState, ServerMessage};
