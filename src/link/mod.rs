//! Link lifecycle: the connection state machine and its collaborators.
//!
//! The engine is a function-pointer table, one row per [`ConnectionState`]:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  StateTable                                                   │
//! │  ┌──────────────┬───────────┬──────────┬───────────────────┐  │
//! │  │ State        │ on_enter  │ on_exit  │ on_update         │  │
//! │  ├──────────────┼───────────┼──────────┼───────────────────┤  │
//! │  │ Disconnected │ fn(ctx)   │    -     │ fn(ctx)->Option<> │  │
//! │  │ Advertising  │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │  │
//! │  │ Connecting   │    -      │    -     │ fn(ctx)->Option<> │  │
//! │  │ Connected    │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │  │
//! │  │ Reconnecting │ fn(ctx)   │    -     │ fn(ctx)->Option<> │  │
//! │  │ Error        │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │  │
//! │  └──────────────┴───────────┴──────────┴───────────────────┘  │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the current state; a
//! `Some(next)` result runs `on_exit(current)` then `on_enter(next)`.
//! External signals go through [`LinkManager`], which forces transitions
//! with an explicit [`TransitionCause`].  Handlers never call out: they
//! push [`LinkEvent`]s and [`RadioRequest`]s into the context, drained by
//! the composition root once per tick.

pub mod backoff;
pub mod context;
pub mod events;
pub mod heartbeat;
pub mod states;
pub mod transport;

use context::{LinkContext, TransitionCause};
use log::{debug, info, warn};

pub use backoff::ReconnectPolicy;
pub use events::{LinkEvent, RadioRequest};
pub use heartbeat::HeartbeatTracker;

use crate::config::LinkConfig;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Link lifecycle state.  Exactly one is active at any time.
/// Must stay in sync with the table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Advertising = 1,
    Connecting = 2,
    Connected = 3,
    Reconnecting = 4,
    Error = 5,
}

impl ConnectionState {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 6;

    /// Convert a table index back to a state.  Out-of-range indices assert in
    /// debug builds and map to `Error` in release.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Disconnected,
            1 => Self::Advertising,
            2 => Self::Connecting,
            3 => Self::Connected,
            4 => Self::Reconnecting,
            5 => Self::Error,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Error
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Advertising => "Advertising",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::Reconnecting => "Reconnecting",
            Self::Error => "Error",
        }
    }
}

impl core::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Read-only view used by the messaging core
// ---------------------------------------------------------------------------

/// What the messaging core may know about the link.  It reads, never mutates.
pub trait LinkStatus {
    fn is_connected(&self) -> bool;

    /// Period at which the device emits its own heartbeat while connected.
    fn heartbeat_interval_ms(&self) -> u32;
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type StateActionFn = fn(&mut LinkContext);

/// Signature for the per-tick update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn = fn(&mut LinkContext) -> Option<ConnectionState>;

/// Static descriptor for a single link state.
pub struct StateDescriptor {
    pub id: ConnectionState,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

pub struct LinkFsm {
    /// Fixed-size table indexed by `ConnectionState as usize`.
    table: [StateDescriptor; ConnectionState::COUNT],
    /// Index of the currently active state.
    current: usize,
    /// Number of real transitions since start.
    transitions: u32,
}

impl LinkFsm {
    pub fn new(table: [StateDescriptor; ConnectionState::COUNT], initial: ConnectionState) -> Self {
        Self {
            table,
            current: initial as usize,
            transitions: 0,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    pub fn start(&mut self, ctx: &mut LinkContext) {
        info!("LINK starting in state: {}", self.table[self.current].name);
        ctx.state_entered_ms = ctx.now_ms;
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Evaluate the current state's timers once.  At most one transition.
    pub fn tick(&mut self, ctx: &mut LinkContext) {
        ctx.cause = TransitionCause::Timer;
        if let Some(next) = (self.table[self.current].on_update)(ctx) {
            let cause = ctx.cause;
            self.transition(next, cause, ctx);
        }
    }

    /// Transition driven by an external signal.  A no-op when `next` is
    /// already the current state.
    pub fn force_transition(
        &mut self,
        next: ConnectionState,
        cause: TransitionCause,
        ctx: &mut LinkContext,
    ) {
        self.transition(next, cause, ctx);
    }

    pub fn current_state(&self) -> ConnectionState {
        self.table[self.current].id
    }

    pub fn transition_count(&self) -> u32 {
        self.transitions
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next: ConnectionState, cause: TransitionCause, ctx: &mut LinkContext) {
        let next_idx = next as usize;
        if next_idx == self.current {
            return;
        }

        info!(
            "LINK transition: {} -> {} ({:?})",
            self.table[self.current].name, self.table[next_idx].name, cause
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        ctx.previous = self.table[self.current].id;
        ctx.cause = cause;
        ctx.state_entered_ms = ctx.now_ms;
        self.current = next_idx;
        self.transitions = self.transitions.wrapping_add(1);

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}

// ---------------------------------------------------------------------------
// Public facade
// ---------------------------------------------------------------------------

/// Snapshot of link statistics for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkStats {
    pub state: ConnectionState,
    pub reconnect_attempts: u16,
    pub backoff_interval_ms: u32,
    pub last_attempt_ms: Option<u64>,
    pub connected_since_ms: Option<u64>,
    pub connection_duration_ms: u64,
    pub transitions: u32,
}

/// The connection state machine as the rest of the firmware sees it.
///
/// Owns the engine and its context.  Every operation takes the current
/// monotonic time so the machine itself never reads a clock.
pub struct LinkManager {
    fsm: LinkFsm,
    ctx: LinkContext,
}

impl LinkManager {
    pub fn new(config: &LinkConfig) -> Self {
        Self {
            fsm: LinkFsm::new(states::build_state_table(), ConnectionState::Disconnected),
            ctx: LinkContext::new(config),
        }
    }

    /// Enter the initial state.  Call once before the first [`tick`](Self::tick).
    pub fn begin(&mut self, now_ms: u64) {
        self.ctx.now_ms = now_ms;
        self.fsm.start(&mut self.ctx);
    }

    /// Evaluate timers: heartbeat timeout, backoff and attempt timeouts.
    pub fn tick(&mut self, now_ms: u64) {
        self.ctx.now_ms = now_ms;
        self.fsm.tick(&mut self.ctx);
    }

    pub fn state(&self) -> ConnectionState {
        self.fsm.current_state()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    // -- External signals ---------------------------------------------------

    /// The transport reports a peer attached.
    pub fn on_peer_attached(&mut self, now_ms: u64) {
        self.ctx.now_ms = now_ms;
        match self.state() {
            ConnectionState::Error => {
                warn!("LINK: peer attached while in Error, ignoring until reset");
            }
            _ => self.force(ConnectionState::Connected, TransitionCause::PeerAttached),
        }
    }

    /// The transport reports the peer detached.
    pub fn on_peer_detached(&mut self, now_ms: u64) {
        self.ctx.now_ms = now_ms;
        match self.state() {
            ConnectionState::Connected => {
                self.force(ConnectionState::Disconnected, TransitionCause::PeerDetached);
            }
            ConnectionState::Connecting => {
                self.force(ConnectionState::Reconnecting, TransitionCause::PeerDetached);
            }
            other => debug!("LINK: peer detach ignored in {other}"),
        }
    }

    /// The radio started a connection handshake while advertising.
    pub fn mark_connecting(&mut self, now_ms: u64) {
        self.ctx.now_ms = now_ms;
        if self.state() == ConnectionState::Advertising {
            self.force(ConnectionState::Connecting, TransitionCause::Handshake);
        }
    }

    /// Any inbound traffic from the peer proves it is alive.
    pub fn record_peer_activity(&mut self, now_ms: u64) {
        if self.is_connected() {
            self.ctx.heartbeat.mark_seen(now_ms);
        }
    }

    // -- Explicit requests --------------------------------------------------

    /// Drop the link without a "disconnected" notification.
    pub fn request_disconnect(&mut self, now_ms: u64) {
        self.ctx.now_ms = now_ms;
        if self.state() == ConnectionState::Error {
            warn!("LINK: disconnect request ignored in Error");
            return;
        }
        self.force(ConnectionState::Disconnected, TransitionCause::Requested);
    }

    /// Start a fresh reconnection cycle with a clean backoff.
    pub fn request_reconnect(&mut self, now_ms: u64) {
        self.ctx.now_ms = now_ms;
        if self.state() == ConnectionState::Error {
            warn!("LINK: reconnect request ignored in Error, reset first");
            return;
        }
        self.ctx.policy.reset();
        self.force(ConnectionState::Reconnecting, TransitionCause::Requested);
    }

    /// Leave `Error` (or any other state) for `Disconnected` with a clean
    /// backoff.  The only way out of `Error`.
    pub fn reset(&mut self, now_ms: u64) {
        self.ctx.now_ms = now_ms;
        self.ctx.policy.reset();
        self.force(ConnectionState::Disconnected, TransitionCause::Reset);
    }

    // -- Outputs ------------------------------------------------------------

    /// Hand every pending lifecycle notification to `handler`, in order.
    pub fn drain_events(&mut self, handler: impl FnMut(LinkEvent)) {
        self.ctx.events.drain(handler);
    }

    /// Next radio side effect the transport must carry out.
    pub fn take_radio_request(&mut self) -> Option<RadioRequest> {
        self.ctx.requests.pop()
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.ctx.policy
    }

    pub fn heartbeat(&self) -> &HeartbeatTracker {
        &self.ctx.heartbeat
    }

    pub fn stats(&self, now_ms: u64) -> LinkStats {
        LinkStats {
            state: self.state(),
            reconnect_attempts: self.ctx.policy.attempt_count(),
            backoff_interval_ms: self.ctx.policy.interval_ms(),
            last_attempt_ms: self.ctx.last_attempt_ms,
            connected_since_ms: self.ctx.connected_since_ms,
            connection_duration_ms: self
                .ctx
                .connected_since_ms
                .map_or(0, |since| now_ms.saturating_sub(since)),
            transitions: self.fsm.transition_count(),
        }
    }

    fn force(&mut self, next: ConnectionState, cause: TransitionCause) {
        self.fsm.force_transition(next, cause, &mut self.ctx);
    }
}

impl LinkStatus for LinkManager {
    fn is_connected(&self) -> bool {
        LinkManager::is_connected(self)
    }

    fn heartbeat_interval_ms(&self) -> u32 {
        self.ctx.heartbeat.interval_ms()
    }
}
