//! Shared mutable context threaded through every link state handler.
//!
//! `LinkContext` is the blackboard the handlers read from and write to:
//! the current time, how the current state was reached, the backoff and
//! liveness trackers, and the outbound queues of notifications and radio
//! requests.

use super::ConnectionState;
use super::backoff::ReconnectPolicy;
use super::events::{EventQueue, LinkEvent, RadioRequest, RequestQueue};
use super::heartbeat::HeartbeatTracker;
use crate::config::LinkConfig;

/// What drove the most recent transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionCause {
    /// A timer evaluated by `on_update` (backoff, attempt timeout).
    Timer,
    /// The connected peer went silent for longer than the heartbeat timeout.
    HeartbeatTimeout,
    /// The transport reported that a peer attached.
    PeerAttached,
    /// The transport reported that the peer detached.
    PeerDetached,
    /// The radio began a connection handshake.
    Handshake,
    /// Explicit disconnect or reconnect from the application.
    Requested,
    /// Explicit recovery out of `Error`.
    Reset,
}

pub struct LinkContext {
    // -- Timing --
    /// Current monotonic time (ms), updated before every handler call.
    pub now_ms: u64,
    /// Time at which the current state was entered (ms).
    pub state_entered_ms: u64,
    /// How long an advertising/connecting attempt may last (ms).
    pub attempt_timeout_ms: u32,

    // -- Transition bookkeeping --
    /// State that was active before the current one.
    pub previous: ConnectionState,
    /// Why the current state was entered.
    pub cause: TransitionCause,

    // -- Trackers --
    pub policy: ReconnectPolicy,
    pub heartbeat: HeartbeatTracker,

    // -- Statistics --
    /// Time the most recent connection attempt started (ms).
    pub last_attempt_ms: Option<u64>,
    /// Time the current connection was established (ms).
    pub connected_since_ms: Option<u64>,

    // -- Outputs --
    pub events: EventQueue,
    pub requests: RequestQueue,
}

impl LinkContext {
    pub fn new(config: &LinkConfig) -> Self {
        Self {
            now_ms: 0,
            state_entered_ms: 0,
            attempt_timeout_ms: config.connection_attempt_timeout_ms,
            previous: ConnectionState::Disconnected,
            cause: TransitionCause::Timer,
            policy: ReconnectPolicy::new(config),
            heartbeat: HeartbeatTracker::new(config),
            last_attempt_ms: None,
            connected_since_ms: None,
            events: EventQueue::new(),
            requests: RequestQueue::new(),
        }
    }

    /// Milliseconds elapsed since the current state was entered.
    pub fn ms_in_state(&self) -> u64 {
        self.now_ms.saturating_sub(self.state_entered_ms)
    }

    /// The backoff interval for the current cycle has elapsed.
    pub fn backoff_elapsed(&self) -> bool {
        self.ms_in_state() >= u64::from(self.policy.interval_ms())
    }

    /// The current advertising/connecting attempt has run out of time.
    pub fn attempt_timed_out(&self) -> bool {
        self.ms_in_state() >= u64::from(self.attempt_timeout_ms)
    }

    pub fn notify(&mut self, event: LinkEvent) {
        self.events.push(event);
    }

    pub fn request(&mut self, request: RadioRequest) {
        self.requests.push(request);
    }
}
