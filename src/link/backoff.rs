//! Reconnection backoff policy.
//!
//! The interval doubles on every connection attempt that is started from
//! `Reconnecting` and is capped at the configured maximum.  Reaching
//! `Connected`, or an explicit reconnect request, restores the initial value
//! and clears the attempt counter.

use crate::config::LinkConfig;

/// Backoff bookkeeping owned by the connection state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    initial_ms: u32,
    interval_ms: u32,
    max_interval_ms: u32,
    max_attempts: u16,
    attempt_count: u16,
}

impl ReconnectPolicy {
    pub fn new(config: &LinkConfig) -> Self {
        let max_interval_ms = config.reconnect_max_interval_ms;
        let initial_ms = config.reconnect_initial_interval_ms.min(max_interval_ms);
        Self {
            initial_ms,
            interval_ms: initial_ms,
            max_interval_ms,
            max_attempts: config.max_reconnect_attempts,
            attempt_count: 0,
        }
    }

    /// Account for one attempt: bump the counter and grow the interval.
    pub fn record_attempt(&mut self) {
        self.attempt_count = self.attempt_count.saturating_add(1);
        self.interval_ms = self
            .interval_ms
            .saturating_mul(2)
            .min(self.max_interval_ms);
    }

    /// Back to the initial interval with a clean attempt counter.
    pub fn reset(&mut self) {
        self.interval_ms = self.initial_ms;
        self.attempt_count = 0;
    }

    /// `true` once no further attempt is allowed.
    pub fn exhausted(&self) -> bool {
        self.attempt_count >= self.max_attempts
    }

    pub fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    pub fn initial_interval_ms(&self) -> u32 {
        self.initial_ms
    }

    pub fn max_interval_ms(&self) -> u32 {
        self.max_interval_ms
    }

    pub fn attempt_count(&self) -> u16 {
        self.attempt_count
    }

    pub fn max_attempts(&self) -> u16 {
        self.max_attempts
    }
}
