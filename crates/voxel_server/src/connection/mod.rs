//! Session tracking for connected clients.
//!
//! This module holds the per-client [`Session`] state and the
//! [`ClientRegistry`] slot table that owns every live session.

pub mod registry;
pub mod session;

pub use registry::ClientRegistry;
pub use session::{
    outbound_channel, OutboundReceiver, OutboundSender, Pose, Session, SessionId, SessionState,
};
