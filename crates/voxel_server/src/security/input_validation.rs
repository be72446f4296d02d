//! Size and format checks for client frames.

use super::SecurityError;
use crate::config::SecurityConfig;
use crate::messaging::ClientMessage;

/// Rejects frames larger than the configured limit.
pub fn validate_message_size(message: &[u8], config: &SecurityConfig) -> Result<(), SecurityError> {
    if message.len() > config.max_message_size {
        return Err(SecurityError::MessageTooLarge(message.len()));
    }
    Ok(())
}

/// Validates and decodes a text frame into a [`ClientMessage`].
///
/// Fails on oversized frames, invalid JSON, a missing `action`, missing or
/// mistyped fields and out-of-range colors. Unrecognised actions decode
/// successfully as [`ClientMessage::Unknown`].
pub fn decode_client_message(text: &str, config: &SecurityConfig) -> Result<ClientMessage, SecurityError> {
    validate_message_size(text.as_bytes(), config)?;

    serde_json::from_str(text).map_err(|e| SecurityError::InvalidMessageFormat(e.to_string()))
}
