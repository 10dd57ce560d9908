//! Concrete link state handlers and table builder.
//!
//! ```text
//!  DISCONNECTED ──[backoff elapsed]──▶ RECONNECTING ──[attempts exhausted]──▶ ERROR
//!       ▲                               │      ▲                               │
//!       │                        [backoff]     [attempt timeout]           [reset]
//!       │                               ▼      │                               │
//!       │                             ADVERTISING ──[handshake]──▶ CONNECTING  │
//!       │                               │                             │        │
//!       │                        [peer attached]              [peer attached]  │
//!       │                               ▼                             │        │
//!       └──[heartbeat timeout / detach]─ CONNECTED ◀──────────────────┘        │
//!       ◀─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Timer-driven edges live in the `*_update` handlers.  Edges caused by
//! external signals (peer attach/detach, explicit requests) are applied by
//! [`super::LinkManager`] through `force_transition`.

use super::context::{LinkContext, TransitionCause};
use super::events::{LinkEvent, RadioRequest};
use super::{ConnectionState, StateDescriptor};
use log::{error, info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; ConnectionState::COUNT] {
    [
        // Index 0: Disconnected
        StateDescriptor {
            id: ConnectionState::Disconnected,
            name: "Disconnected",
            on_enter: Some(disconnected_enter),
            on_exit: None,
            on_update: disconnected_update,
        },
        // Index 1: Advertising
        StateDescriptor {
            id: ConnectionState::Advertising,
            name: "Advertising",
            on_enter: Some(advertising_enter),
            on_exit: Some(advertising_exit),
            on_update: attempt_update,
        },
        // Index 2: Connecting
        StateDescriptor {
            id: ConnectionState::Connecting,
            name: "Connecting",
            on_enter: None,
            on_exit: None,
            on_update: attempt_update,
        },
        // Index 3: Connected
        StateDescriptor {
            id: ConnectionState::Connected,
            name: "Connected",
            on_enter: Some(connected_enter),
            on_exit: Some(connected_exit),
            on_update: connected_update,
        },
        // Index 4: Reconnecting
        StateDescriptor {
            id: ConnectionState::Reconnecting,
            name: "Reconnecting",
            on_enter: Some(reconnecting_enter),
            on_exit: None,
            on_update: reconnecting_update,
        },
        // Index 5: Error
        StateDescriptor {
            id: ConnectionState::Error,
            name: "Error",
            on_enter: Some(error_enter),
            on_exit: Some(error_exit),
            on_update: error_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  DISCONNECTED
// ═══════════════════════════════════════════════════════════════════════════

fn disconnected_enter(ctx: &mut LinkContext) {
    let was_linked = matches!(
        ctx.previous,
        ConnectionState::Connected | ConnectionState::Connecting
    );

    // A stale or unwanted peer must be torn down at the radio as well.
    if was_linked
        && matches!(
            ctx.cause,
            TransitionCause::HeartbeatTimeout | TransitionCause::Requested | TransitionCause::Reset
        )
    {
        ctx.request(RadioRequest::DropPeer);
    }

    if ctx.previous == ConnectionState::Connected {
        match ctx.cause {
            TransitionCause::HeartbeatTimeout => {
                warn!(
                    "LINK: peer silent for more than {} ms, dropping link",
                    ctx.heartbeat.timeout_ms()
                );
                ctx.notify(LinkEvent::Disconnected);
            }
            TransitionCause::PeerDetached => ctx.notify(LinkEvent::Disconnected),
            _ => {}
        }
    }

    ctx.connected_since_ms = None;
}

fn disconnected_update(ctx: &mut LinkContext) -> Option<ConnectionState> {
    if ctx.backoff_elapsed() {
        return Some(ConnectionState::Reconnecting);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  ADVERTISING / CONNECTING
// ═══════════════════════════════════════════════════════════════════════════

fn advertising_enter(ctx: &mut LinkContext) {
    ctx.request(RadioRequest::StartAdvertising);
}

fn advertising_exit(ctx: &mut LinkContext) {
    ctx.request(RadioRequest::StopAdvertising);
}

/// Shared by `Advertising` and `Connecting`: give up on the attempt once it
/// has lasted longer than the attempt timeout.
fn attempt_update(ctx: &mut LinkContext) -> Option<ConnectionState> {
    if ctx.attempt_timed_out() {
        info!(
            "LINK: attempt {} timed out after {} ms",
            ctx.policy.attempt_count(),
            ctx.attempt_timeout_ms
        );
        return Some(ConnectionState::Reconnecting);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  CONNECTED
// ═══════════════════════════════════════════════════════════════════════════

fn connected_enter(ctx: &mut LinkContext) {
    ctx.policy.reset();
    ctx.heartbeat.reset(ctx.now_ms);
    ctx.connected_since_ms = Some(ctx.now_ms);
    ctx.notify(LinkEvent::Connected);
}

fn connected_exit(ctx: &mut LinkContext) {
    if let Some(since) = ctx.connected_since_ms {
        info!(
            "LINK: connection lasted {} ms",
            ctx.now_ms.saturating_sub(since)
        );
    }
}

fn connected_update(ctx: &mut LinkContext) -> Option<ConnectionState> {
    if ctx.heartbeat.is_timed_out(ctx.now_ms) {
        ctx.cause = TransitionCause::HeartbeatTimeout;
        return Some(ConnectionState::Disconnected);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  RECONNECTING
// ═══════════════════════════════════════════════════════════════════════════

fn reconnecting_enter(ctx: &mut LinkContext) {
    // A half-open handshake that was abandoned still holds the peer slot.
    if ctx.previous == ConnectionState::Connecting
        && matches!(ctx.cause, TransitionCause::Timer | TransitionCause::Requested)
    {
        ctx.request(RadioRequest::DropPeer);
    }
    ctx.notify(LinkEvent::Reconnecting);
}

fn reconnecting_update(ctx: &mut LinkContext) -> Option<ConnectionState> {
    if ctx.policy.exhausted() {
        return Some(ConnectionState::Error);
    }

    if ctx.backoff_elapsed() {
        ctx.policy.record_attempt();
        ctx.last_attempt_ms = Some(ctx.now_ms);
        info!(
            "LINK: reconnect attempt {}/{} (next backoff {} ms)",
            ctx.policy.attempt_count(),
            ctx.policy.max_attempts(),
            ctx.policy.interval_ms()
        );
        return Some(ConnectionState::Advertising);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  ERROR
// ═══════════════════════════════════════════════════════════════════════════

fn error_enter(ctx: &mut LinkContext) {
    error!(
        "LINK: giving up after {} reconnect attempts",
        ctx.policy.attempt_count()
    );
    ctx.notify(LinkEvent::Failed);
}

fn error_exit(ctx: &mut LinkContext) {
    ctx.policy.reset();
    info!("LINK: leaving Error");
}

/// Terminal: only an explicit reset leaves this state.
fn error_update(_ctx: &mut LinkContext) -> Option<ConnectionState> {
    None
}
