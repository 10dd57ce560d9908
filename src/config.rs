//! Link and messaging configuration parameters
//!
//! All tunable parameters for the connection and messaging core.
//! Values can be overridden via NVS (non-volatile storage).

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Largest audio chunk a single GATT notification can carry.
pub const MAX_AUDIO_CHUNK: usize = 512;

/// Core link configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    // --- Reconnection backoff ---
    /// First wait between reconnection attempts (milliseconds)
    pub reconnect_initial_interval_ms: u32,
    /// Upper bound for the doubling backoff interval (milliseconds)
    pub reconnect_max_interval_ms: u32,
    /// Failed attempts tolerated before the link enters `Error`
    pub max_reconnect_attempts: u16,
    /// How long one advertising/connecting attempt may last (milliseconds)
    pub connection_attempt_timeout_ms: u32,

    // --- Heartbeat ---
    /// Outbound heartbeat period while connected (milliseconds)
    pub heartbeat_interval_ms: u32,
    /// Silence from the peer after which the link is declared lost (milliseconds)
    pub heartbeat_timeout_ms: u32,

    // --- Audio transfer ---
    /// Bytes per audio notification
    pub audio_chunk_size: u16,
    /// Pause between consecutive audio notifications (milliseconds)
    pub chunk_pacing_ms: u32,

    // --- Messaging ---
    /// Periodic status report interval while connected (milliseconds)
    pub status_interval_ms: u32,
    /// Answer every recognized host command with an `ack` message
    pub ack_commands: bool,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            // Backoff
            reconnect_initial_interval_ms: 1_000,
            reconnect_max_interval_ms: 30_000,
            max_reconnect_attempts: 10,
            connection_attempt_timeout_ms: 10_000,

            // Heartbeat
            heartbeat_interval_ms: 30_000,
            heartbeat_timeout_ms: 60_000,

            // Audio
            audio_chunk_size: 512,
            chunk_pacing_ms: 10,

            // Messaging
            status_interval_ms: 5_000,
            ack_commands: false,
        }
    }
}

impl LinkConfig {
    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reconnect_initial_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "reconnect_initial_interval_ms must be > 0",
            ));
        }
        if self.reconnect_initial_interval_ms > self.reconnect_max_interval_ms {
            return Err(ConfigError::ValidationFailed(
                "reconnect_initial_interval_ms must be <= reconnect_max_interval_ms",
            ));
        }
        if self.max_reconnect_attempts == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_reconnect_attempts must be > 0",
            ));
        }
        if self.connection_attempt_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "connection_attempt_timeout_ms must be > 0",
            ));
        }
        if self.heartbeat_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "heartbeat_interval_ms must be > 0",
            ));
        }
        if self.heartbeat_interval_ms >= self.heartbeat_timeout_ms {
            return Err(ConfigError::ValidationFailed(
                "heartbeat_interval_ms must be < heartbeat_timeout_ms",
            ));
        }
        if self.audio_chunk_size == 0 || self.audio_chunk_size as usize > MAX_AUDIO_CHUNK {
            return Err(ConfigError::ValidationFailed(
                "audio_chunk_size must be 1–512",
            ));
        }
        if self.chunk_pacing_ms > 1_000 {
            return Err(ConfigError::ValidationFailed(
                "chunk_pacing_ms must be 0–1000",
            ));
        }
        if self.status_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "status_interval_ms must be > 0",
            ));
        }
        Ok(())
    }
}
