//! Port traits: the hexagonal boundary between the link core and the rest
//! of the firmware.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ WearableService (domain)
//! ```
//!
//! Driven adapters (clock, gauges, command handling, event sinks, storage)
//! implement these traits.  The [`WearableService`](super::service::WearableService)
//! consumes them via generics, so the core never touches hardware directly.

use crate::config::LinkConfig;
use crate::link::LinkEvent;
use crate::protocol::{Command, ErrorCode, Status};

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic milliseconds since boot.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// System gauges (driven adapter: hardware → heartbeat / status)
// ───────────────────────────────────────────────────────────────

/// Device health figures reported in heartbeats and status messages.
pub trait SystemGauges {
    /// Free heap in bytes.
    fn free_heap(&self) -> u32;

    /// Battery voltage, when a battery monitor is fitted.
    fn battery_volts(&self) -> Option<f32> {
        None
    }

    /// Status the device should report right now.
    fn current_status(&self) -> Status {
        Status::Ready
    }
}

// ───────────────────────────────────────────────────────────────
// Inbound message handling (domain → application subsystems)
// ───────────────────────────────────────────────────────────────

/// Receives decoded host messages.  Only recognized commands reach
/// [`on_command`](Self::on_command); the other hooks default to no-ops.
pub trait CommandHandler {
    /// A host command from the stable vocabulary, with its opaque data string.
    fn on_command(&mut self, command: Command, data: &str);

    /// The host reported its own status.
    fn on_peer_status(&mut self, _status: Status, _data: &str) {}

    /// The host reported an error.
    fn on_peer_error(&mut self, _code: ErrorCode, _description: &str) {}

    /// The host acknowledged one of our messages.
    fn on_ack(&mut self, _ack_id: &str) {}
}

// ───────────────────────────────────────────────────────────────
// Link listener (domain → logging / UI feedback)
// ───────────────────────────────────────────────────────────────

/// Receives lifecycle notifications, at most one per actual transition.
pub trait LinkListener {
    fn on_link_event(&mut self, event: LinkEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists link configuration.
///
/// Implementations MUST validate before persisting.  Invalid ranges are
/// rejected with [`ConfigError::ValidationFailed`], not silently clamped.
pub trait ConfigPort {
    /// Load configuration.  Returns [`LinkConfig::default()`] if nothing is
    /// stored yet.
    fn load(&self) -> Result<LinkConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&mut self, config: &LinkConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl From<ConfigError> for crate::error::Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::ValidationFailed(msg) => Self::Config(msg),
            ConfigError::NotFound => Self::Config("config not found"),
            ConfigError::Corrupted => Self::Config("config corrupted"),
            ConfigError::StorageFull => Self::Config("storage full"),
            ConfigError::IoError => Self::Config("storage I/O error"),
        }
    }
}
