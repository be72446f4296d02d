//! Relay activity counters.
//!
//! Counters are plain atomics so the monitoring loop and the health check can
//! read them without taking the relay lock.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Live counters updated by the connection handlers and the relay.
#[derive(Debug)]
pub struct RelayStats {
    sessions_opened: AtomicU64,
    sessions_closed: AtomicU64,
    sessions_refused: AtomicU64,
    live_sessions: AtomicU64,
    messages_applied: AtomicU64,
    messages_ignored: AtomicU64,
    messages_rejected: AtomicU64,
    events_broadcast: AtomicU64,
    start_time: Instant,
}

/// Point-in-time copy of [`RelayStats`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub uptime_seconds: u64,
    pub sessions_opened: u64,
    pub sessions_closed: u64,
    pub sessions_refused: u64,
    pub live_sessions: u64,
    pub messages_applied: u64,
    pub messages_ignored: u64,
    pub messages_rejected: u64,
    /// Individual queue deliveries, so one broadcast to 10 sessions counts 10
    pub events_broadcast: u64,
}

impl RelayStats {
    pub fn new() -> Self {
        Self {
            sessions_opened: AtomicU64::new(0),
            sessions_closed: AtomicU64::new(0),
            sessions_refused: AtomicU64::new(0),
            live_sessions: AtomicU64::new(0),
            messages_applied: AtomicU64::new(0),
            messages_ignored: AtomicU64::new(0),
            messages_rejected: AtomicU64::new(0),
            events_broadcast: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn session_opened(&self) {
        self.sessions_opened.fetch_add(1, Ordering::Relaxed);
        self.live_sessions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_closed(&self) {
        self.sessions_closed.fetch_add(1, Ordering::Relaxed);
        // Saturating: a close can never outnumber the opens that preceded it.
        let _ = self
            .live_sessions
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |live| live.checked_sub(1));
    }

    pub fn session_refused(&self) {
        self.sessions_refused.fetch_add(1, Ordering::Relaxed);
    }

    pub fn message_applied(&self) {
        self.messages_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn message_ignored(&self) {
        self.messages_ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn message_rejected(&self) {
        self.messages_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn events_broadcast(&self, deliveries: usize) {
        self.events_broadcast
            .fetch_add(deliveries as u64, Ordering::Relaxed);
    }

    /// Current number of registered sessions.
    pub fn live_sessions(&self) -> u64 {
        self.live_sessions.load(Ordering::Relaxed)
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            uptime_seconds: self.uptime_seconds(),
            sessions_opened: self.sessions_opened.load(Ordering::Relaxed),
            sessions_closed: self.sessions_closed.load(Ordering::Relaxed),
            sessions_refused: self.sessions_refused.load(Ordering::Relaxed),
            live_sessions: self.live_sessions.load(Ordering::Relaxed),
            messages_applied: self.messages_applied.load(Ordering::Relaxed),
            messages_ignored: self.messages_ignored.load(Ordering::Relaxed),
            messages_rejected: self.messages_rejected.load(Ordering::Relaxed),
            events_broadcast: self.events_broadcast.load(Ordering::Relaxed),
        }
    }
}

impl Default for RelayStats {
    fn default() -> Self {
        Self::new()
    }
}
