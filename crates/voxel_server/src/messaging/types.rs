//! Wire message definitions.
//!
//! Every frame is a JSON object carrying an `action` discriminator. Inbound
//! frames decode into [`ClientMessage`]; everything the relay sends is a
//! [`ServerMessage`].

use crate::connection::{Pose, SessionId};
use crate::world::{Color, Voxel, VoxelPos, WorldSnapshot};
use serde::{Deserialize, Serialize};

/// A message sent from a client to the relay.
///
/// Unknown fields are ignored. An unrecognised `action` decodes to
/// [`ClientMessage::Unknown`] so that it can be treated as a no-op rather
/// than a decode failure.
///
/// ```json
/// { "action": "place", "x": 3, "y": 6, "z": 10 }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Change the sender's building color
    Color { color: Color },
    /// Fill a voxel with the sender's current color
    Place(BlockCoords),
    /// Clear a voxel
    Break(BlockCoords),
    /// Report the sender's new pose
    Move(Pose),
    #[serde(other)]
    Unknown,
}

/// Raw block coordinates as they arrive on the wire.
///
/// Only [`crate::world::WorldGrid::locate`] turns these into a usable
/// position.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BlockCoords {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Public view of a session: who it is, what color it builds with and where
/// it stands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlayerState {
    pub id: SessionId,
    pub color: Color,
    #[serde(flatten)]
    pub pose: Pose,
}

/// A message sent from the relay to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Private initialization for a newly connected session
    Connect {
        #[serde(flatten)]
        player: PlayerState,
        map: WorldSnapshot,
        /// Every other live session at the moment of connection
        players: Vec<PlayerState>,
    },
    Join(PlayerState),
    Leave { id: SessionId },
    Move {
        id: SessionId,
        #[serde(flatten)]
        pose: Pose,
    },
    Color { id: SessionId, color: Color },
    Place {
        x: usize,
        y: usize,
        z: usize,
        color: Option<Color>,
    },
    Break {
        x: usize,
        y: usize,
        z: usize,
        color: Option<Color>,
    },
}

impl ServerMessage {
    /// Block update describing the voxel's state after a mutation.
    ///
    /// A filled voxel is announced as `place` with its color, an empty one as
    /// `break` with a null color, whichever action caused the change.
    pub fn block(pos: VoxelPos, voxel: Voxel) -> Self {
        let (x, y, z) = (pos.x(), pos.y(), pos.z());
        match voxel {
            Some(color) => ServerMessage::Place {
                x,
                y,
                z,
                color: Some(color),
            },
            None => ServerMessage::Break {
                x,
                y,
                z,
                color: None,
            },
        }
    }

    /// The `action` tag this message is sent with.
    pub fn action(&self) -> &'static str {
        match self {
            ServerMessage::Connect { .. } => "connect",
            ServerMessage::Join(_) => "join",
            ServerMessage::Leave { .. } => "leave",
            ServerMessage::Move { .. } => "move",
            ServerMessage::Color { .. } => "color",
            ServerMessage::Place { .. } => "place",
            ServerMessage::Break { .. } => "break",
        }
    }
}
