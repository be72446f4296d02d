//! Connection handling logic for WebSocket clients.
//!
//! This module contains the per-connection lifecycle: WebSocket handshake,
//! registration with the relay, the reader and writer loops, and cleanup.

use crate::{
    config::SecurityConfig,
    connection::{outbound_channel, SessionState},
    error::ServerError,
    messaging::route_client_message,
    relay::{Relay, RelayStats},
};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::{
    accept_async,
    tungstenite::{
        error::ProtocolError,
        protocol::{frame::coding::CloseCode, CloseFrame},
        Error as WsError, Message,
    },
};
use tracing::{debug, error, info, trace, warn};

/// How long a closing session gets to flush its close frame.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Handles a single client connection from handshake to cleanup.
///
/// # Connection Flow
///
/// 1. Perform the WebSocket handshake
/// 2. Register with the relay, which queues the private `connect` message and
///    broadcasts the `join`; refuse with a close frame if the relay is full
/// 3. Run the reader and writer loops until either ends
/// 4. Unregister from the relay, which broadcasts the `leave`
///
/// # Message Handling
///
/// * **Reader**: decodes text frames and applies them to the relay. Malformed
///   frames are dropped without a reply. Binary frames are ignored; pings
///   and the close reply are answered by tungstenite itself.
/// * **Writer**: drains the session's outbound queue and sends each message
///   as a JSON text frame.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    relay: Arc<Mutex<Relay>>,
    stats: Arc<RelayStats>,
    security: SecurityConfig,
) -> Result<(), ServerError> {
    // Perform WebSocket handshake
    let ws_stream = accept_async(stream)
        .await
        .map_err(|e| ServerError::Network(format!("WebSocket handshake failed: {e}")))?;

    let (ws_sender, mut ws_receiver) = ws_stream.split();
    let ws_sender = Arc::new(Mutex::new(ws_sender));
    let mut state = SessionState::Connecting;

    let (outbound, mut outbound_receiver) = outbound_channel();
    let connected = relay.lock().await.connect(outbound);
    let session_id = match connected {
        Ok(id) => id,
        Err(e) => {
            warn!("🚫 Refusing connection from {}: {}", addr, e);
            let close = CloseFrame {
                code: CloseCode::Again,
                reason: e.to_string().into(),
            };
            let mut ws_sender = ws_sender.lock().await;
            let _ = ws_sender.send(Message::Close(Some(close))).await;
            return Ok(());
        }
    };
    state.activate(session_id);
    info!("🔗 Client {} connected as session {}", addr, session_id);

    let ws_sender_outgoing = ws_sender.clone();

    // Incoming message task - decodes frames and applies them to the relay
    let incoming_task = {
        let relay = relay.clone();
        let stats = stats.clone();

        async move {
            while let Some(msg) = ws_receiver.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        if let Err(e) =
                            route_client_message(text.as_str(), session_id, &relay, &security).await
                        {
                            debug!("🗑️ Dropping frame from session {}: {}", session_id, e);
                            stats.message_rejected();
                        }
                    }
                    Ok(Message::Close(_)) => {
                        debug!("🔌 Session {} requested close", session_id);
                        break;
                    }
                    Ok(Message::Binary(_)) => {
                        trace!("Ignoring binary frame from session {}", session_id);
                    }
                    Ok(_) => {}
                    Err(e) if is_fatal(&e) => {
                        debug!("WebSocket closed for session {}: {}", session_id, e);
                        break;
                    }
                    Err(e) => {
                        warn!("WebSocket error for session {}: {}", session_id, e);
                    }
                }
            }
        }
    };

    // Outgoing message task - serializes queued relay events
    let outgoing_task = {
        let ws_sender = ws_sender_outgoing;
        async move {
            while let Some(message) = outbound_receiver.recv().await {
                let text = match serde_json::to_string(&*message) {
                    Ok(text) => text,
                    Err(e) => {
                        error!("Failed to encode {} for session {}: {}", message.action(), session_id, e);
                        continue;
                    }
                };

                let mut ws_sender = ws_sender.lock().await;
                if let Err(e) = ws_sender.send(Message::Text(text.into())).await {
                    debug!("Failed to send to session {}: {}", session_id, e);
                    break;
                }
            }
        }
    };

    // Run both tasks concurrently until one completes
    tokio::select! {
        _ = incoming_task => {},
        _ = outgoing_task => {},
    }

    if let Some(id) = state.close() {
        relay.lock().await.disconnect(id);
    }

    // Flushes the close reply tungstenite queued for a peer-initiated close,
    // or starts the handshake ourselves when the writer ended first.
    let mut sink = ws_sender.lock().await;
    match tokio::time::timeout(CLOSE_TIMEOUT, sink.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!("Close handshake for session {} failed: {}", session_id, e),
        Err(_) => debug!("Close handshake for session {} timed out", session_id),
    }
    info!("🔌 Client {} disconnected (session {})", addr, session_id);

    Ok(())
}

/// Errors after which the socket can no longer be read.
fn is_fatal(error: &WsError) -> bool {
    matches!(
        error,
        WsError::Io(_)
            | WsError::ConnectionClosed
            | WsError::AlreadyClosed
            | WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake)
    )
}
