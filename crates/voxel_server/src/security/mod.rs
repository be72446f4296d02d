//! Inbound message validation.
//!
//! Every text frame passes through here before it reaches the relay. A frame
//! that fails validation is dropped without a reply and the connection stays
//! open.

pub mod input_validation;

pub use input_validation::{decode_client_message, validate_message_size};

/// Security-related errors
#[derive(Debug, thiserror::Error)]
pub enum SecurityError {
    #[error("Message too large: {0} bytes")]
    MessageTooLarge(usize),

    #[error("Invalid message format: {0}")]
    InvalidMessageFormat(String),
}
