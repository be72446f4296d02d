//! Server-side state of one connected client.

use crate::messaging::{PlayerState, ServerMessage};
use crate::world::Color;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Public session identifier: the registry slot index.
///
/// Only unique among sessions connected at the same instant; a freed slot is
/// handed to the next connecting session.
pub type SessionId = usize;

/// Queue feeding a session's socket writer.
pub type OutboundSender = mpsc::UnboundedSender<Arc<ServerMessage>>;

/// Receiving half of [`OutboundSender`].
pub type OutboundReceiver = mpsc::UnboundedReceiver<Arc<ServerMessage>>;

/// Creates a new outbound queue.
pub fn outbound_channel() -> (OutboundSender, OutboundReceiver) {
    mpsc::unbounded_channel()
}

/// Position and orientation of a player.
///
/// Client supplied and trusted as-is.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl Pose {
    /// A pose at the given position looking straight ahead.
    pub fn at(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            pitch: 0.0,
            yaw: 0.0,
        }
    }
}

/// Lifecycle of a connection as seen by the socket handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Handshake done, not yet registered
    Connecting,
    /// Registered under the given slot
    Active(SessionId),
    /// Removed from the registry; terminal
    Closed,
}

impl SessionState {
    /// The registered id, if the session is active.
    pub fn active_id(&self) -> Option<SessionId> {
        match self {
            SessionState::Active(id) => Some(*id),
            _ => None,
        }
    }

    /// Moves to [`SessionState::Active`]. Only valid from `Connecting`.
    pub fn activate(&mut self, id: SessionId) -> bool {
        if *self != SessionState::Connecting {
            return false;
        }
        *self = SessionState::Active(id);
        true
    }

    /// Moves to [`SessionState::Closed`], returning the id that must be
    /// unregistered. Yields `Some` at most once per connection.
    pub fn close(&mut self) -> Option<SessionId> {
        let id = self.active_id();
        *self = SessionState::Closed;
        id
    }
}

/// One connected client.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    pub color: Color,
    pub pose: Pose,
    outbound: OutboundSender,
}

impl Session {
    pub(crate) fn new(id: SessionId, pose: Pose, outbound: OutboundSender) -> Self {
        Self {
            id,
            color: Color::WHITE,
            pose,
            outbound,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The record other clients use to render this player.
    pub fn state(&self) -> PlayerState {
        PlayerState {
            id: self.id,
            color: self.color,
            pose: self.pose,
        }
    }

    /// Queues a message for this session's socket.
    ///
    /// Returns false when the writer side has already gone away.
    pub fn send(&self, message: Arc<ServerMessage>) -> bool {
        self.outbound.send(message).is_ok()
    }
}
