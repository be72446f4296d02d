//! Error types and handling for the relay server.
//!
//! This module defines the error types that can occur during server operations,
//! providing clear categorization of different failure modes.

use crate::connection::SessionId;

/// Enumeration of possible server errors.
///
/// Categorizes errors into network-related and internal server errors
/// to help with debugging and error handling.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Network-related errors such as binding failures or connection issues
    #[error("Network error: {0}")]
    Network(String),

    /// Internal server errors such as a world too large to allocate
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised by the relay state machine itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    /// The registry already holds the configured maximum of live sessions
    #[error("Server full: {capacity} sessions connected")]
    ServerFull { capacity: usize },

    #[error("Unknown session {0}")]
    UnknownSession(SessionId),
}
