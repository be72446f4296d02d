//! Routing of inbound text frames into the relay.

use crate::config::SecurityConfig;
use crate::connection::SessionId;
use crate::relay::{Disposition, Relay};
use crate::security::{decode_client_message, SecurityError};
use tokio::sync::Mutex;
use tracing::trace;

/// Decodes a raw client frame and applies it to the relay.
///
/// Decoding happens before the relay lock is taken, so a flood of malformed
/// frames never contends with well-behaved sessions. The lock is then held
/// for the whole mutate-and-broadcast step.
///
/// # Returns
///
/// The [`Disposition`] reported by the relay, or a [`SecurityError`] if the
/// frame was oversized or malformed. Callers drop rejected frames without
/// replying.
pub async fn route_client_message(
    text: &str,
    session_id: SessionId,
    relay: &Mutex<Relay>,
    security: &SecurityConfig,
) -> Result<Disposition, SecurityError> {
    let message = decode_client_message(text, security)?;
    trace!("📨 Session {} sent {:?}", session_id, message);

    let mut relay = relay.lock().await;
    Ok(relay.handle_message(session_id, message))
}
