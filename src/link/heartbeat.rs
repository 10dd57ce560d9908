//! Peer liveness tracking.
//!
//! Any inbound traffic from the peer counts as a sign of life.  While the
//! link is `Connected` the state machine checks [`HeartbeatTracker::is_timed_out`]
//! on every tick, before anything is sent.

use crate::config::LinkConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatTracker {
    last_seen_ms: u64,
    interval_ms: u32,
    timeout_ms: u32,
}

impl HeartbeatTracker {
    pub fn new(config: &LinkConfig) -> Self {
        Self {
            last_seen_ms: 0,
            interval_ms: config.heartbeat_interval_ms,
            timeout_ms: config.heartbeat_timeout_ms,
        }
    }

    /// Restart the liveness window (called when the link comes up).
    pub fn reset(&mut self, now_ms: u64) {
        self.last_seen_ms = now_ms;
    }

    /// Record inbound traffic from the peer.
    pub fn mark_seen(&mut self, now_ms: u64) {
        self.last_seen_ms = self.last_seen_ms.max(now_ms);
    }

    /// Silence has lasted strictly longer than the timeout.
    pub fn is_timed_out(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_seen_ms) > u64::from(self.timeout_ms)
    }

    pub fn last_seen_ms(&self) -> u64 {
        self.last_seen_ms
    }

    /// Period at which the device emits its own heartbeat.
    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }
}
