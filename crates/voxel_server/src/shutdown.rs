//! Shutdown coordination for graceful relay shutdown.
//!
//! The application flips [`ShutdownState`] when a termination signal arrives;
//! the accept loop checks it before taking new connections.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Shared shutdown state for coordinating graceful shutdown across components.
#[derive(Debug, Clone)]
pub struct ShutdownState {
    /// Set once shutdown begins; no new sessions are accepted after this
    shutdown_initiated: Arc<AtomicBool>,
    /// Set once connected sessions have been drained
    shutdown_complete: Arc<AtomicBool>,
}

impl ShutdownState {
    /// Creates a new shutdown state with both flags set to false.
    pub fn new() -> Self {
        Self {
            shutdown_initiated: Arc::new(AtomicBool::new(false)),
            shutdown_complete: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns true if shutdown has been initiated.
    pub fn is_shutdown_initiated(&self) -> bool {
        self.shutdown_initiated.load(Ordering::Acquire)
    }

    /// Returns true if shutdown is complete and final cleanup can begin.
    pub fn is_shutdown_complete(&self) -> bool {
        self.shutdown_complete.load(Ordering::Acquire)
    }

    /// Initiates shutdown: stop accepting new sessions.
    pub fn initiate_shutdown(&self) {
        self.shutdown_initiated.store(true, Ordering::Release);
        info!("🛑 Shutdown initiated - no new sessions will be accepted");
    }

    /// Marks shutdown as complete.
    pub fn complete_shutdown(&self) {
        self.shutdown_complete.store(true, Ordering::Release);
        info!("✅ Sessions drained - ready for final cleanup");
    }
}

impl Default for ShutdownState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_are_shared_between_clones() {
        let state = ShutdownState::new();
        let clone = state.clone();
        assert!(!clone.is_shutdown_initiated());

        state.initiate_shutdown();
        assert!(clone.is_shutdown_initiated());
        assert!(!clone.is_shutdown_complete());

        clone.complete_shutdown();
        assert!(state.is_shutdown_complete());
    }
}
