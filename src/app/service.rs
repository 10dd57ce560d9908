//! Wearable service: the composition root of the link core.
//!
//! [`WearableService`] owns the connection state machine, the messaging
//! core and the transport.  It exposes a clean, hardware-agnostic API.
//! The remaining ports are injected at call sites, making the entire
//! service testable with mock adapters.
//!
//! ```text
//!  LinkTransport ◀─▶ ┌──────────────────────────┐ ──▶ LinkListener
//!                    │     WearableService      │ ──▶ CommandHandler
//!  SystemGauges  ──▶ │  LinkManager · Messenger │
//!                    └──────────────────────────┘
//! ```
//!
//! One [`tick`](WearableService::tick) runs, strictly in this order:
//!
//! 1. drain transport events (attach/detach/handshake go to the state
//!    machine, inbound bytes are buffered and count as peer activity)
//! 2. state machine timers (heartbeat timeout first, then backoff/attempts)
//! 3. radio requests produced by the transitions
//! 4. lifecycle notifications to the [`LinkListener`]
//! 5. inbound dispatch of the buffered records
//! 6. periodic heartbeat and status

extern crate alloc;
use alloc::format;
use alloc::vec::Vec;

use embedded_hal::delay::DelayNs;
use heapless::Deque;
use log::{debug, info, warn};

use crate::config::LinkConfig;
use crate::error::Result;
use crate::link::transport::{Channel, LinkTransport, TransportEvent};
use crate::link::{ConnectionState, LinkEvent, LinkManager, LinkStats, RadioRequest};
use crate::protocol::{Command, ErrorCode, Messenger, MessengerStats, Status};

use super::events::DeviceEvent;
use super::ports::{CommandHandler, LinkListener, SystemGauges};

/// Transport events consumed per tick; the rest wait for the next tick.
const MAX_TRANSPORT_EVENTS_PER_TICK: usize = 16;

/// Inbound records buffered between the drain and dispatch steps.
const INBOUND_QUEUE_CAP: usize = 8;

// ───────────────────────────────────────────────────────────────
// WearableService
// ───────────────────────────────────────────────────────────────

pub struct WearableService<T: LinkTransport> {
    link: LinkManager,
    messenger: Messenger,
    transport: T,
    inbound: Deque<(Channel, Vec<u8>), INBOUND_QUEUE_CAP>,
    inbound_dropped: u32,
    tick_count: u64,
}

impl<T: LinkTransport> WearableService<T> {
    /// Construct the service.  `id_prefix` tags every outbound message id.
    ///
    /// Does **not** start the link; call [`start`](Self::start) next.
    pub fn new(config: &LinkConfig, id_prefix: &str, transport: T) -> Self {
        Self {
            link: LinkManager::new(config),
            messenger: Messenger::new(config, id_prefix),
            transport,
            inbound: Deque::new(),
            inbound_dropped: 0,
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Enter the initial link state (`Disconnected`).
    pub fn start(&mut self, now_ms: u64) {
        self.link.begin(now_ms);
        info!("WearableService started in {}", self.link.state());
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one scheduling tick.  Never blocks.
    pub fn tick(
        &mut self,
        now_ms: u64,
        handler: &mut impl CommandHandler,
        listener: &mut impl LinkListener,
        gauges: &impl SystemGauges,
    ) {
        self.tick_count += 1;
        self.messenger.set_battery(gauges.battery_volts());

        // 1. Transport events
        self.drain_transport(now_ms);

        // 2. State machine timers
        self.link.tick(now_ms);

        // 3. Radio side effects
        self.apply_radio_requests();

        // 4. Lifecycle notifications
        let mut link_up = false;
        self.link.drain_events(|event| {
            if event == LinkEvent::Connected {
                link_up = true;
            }
            listener.on_link_event(event);
        });
        if link_up {
            self.messenger.on_link_up(now_ms);
        }

        // 5. Inbound dispatch
        let free_heap = gauges.free_heap();
        while let Some((channel, bytes)) = self.inbound.pop_front() {
            let outcome = self.messenger.handle_inbound(
                &mut self.transport,
                &self.link,
                handler,
                now_ms,
                free_heap,
                channel,
                &bytes,
            );
            debug!("inbound {} B on {}: {:?}", bytes.len(), channel.as_str(), outcome);
        }

        // 6. Periodic emission
        self.messenger
            .poll_heartbeat(&mut self.transport, &self.link, now_ms, free_heap);
        self.messenger.poll_status(
            &mut self.transport,
            &self.link,
            now_ms,
            gauges.current_status(),
        );
    }

    fn drain_transport(&mut self, now_ms: u64) {
        for _ in 0..MAX_TRANSPORT_EVENTS_PER_TICK {
            let Some(event) = self.transport.poll_event() else {
                break;
            };
            match event {
                TransportEvent::PeerAttached => self.link.on_peer_attached(now_ms),
                TransportEvent::PeerDetached => self.link.on_peer_detached(now_ms),
                TransportEvent::Handshake => self.link.mark_connecting(now_ms),
                TransportEvent::BytesReceived { channel, bytes } => {
                    self.link.record_peer_activity(now_ms);
                    if self.inbound.push_back((channel, bytes)).is_err() {
                        self.inbound_dropped = self.inbound_dropped.wrapping_add(1);
                        warn!(
                            "inbound queue full, record dropped ({} total)",
                            self.inbound_dropped
                        );
                    }
                }
            }
        }
    }

    fn apply_radio_requests(&mut self) {
        while let Some(request) = self.link.take_radio_request() {
            let result = match request {
                RadioRequest::StartAdvertising => self.transport.start_advertising(),
                RadioRequest::StopAdvertising => self.transport.stop_advertising(),
                RadioRequest::DropPeer => self.transport.disconnect_peer(),
            };
            if let Err(e) = result {
                warn!("radio request {:?} failed: {:?}", request, e);
            }
        }
    }

    // ── Device events ─────────────────────────────────────────

    /// Turn one application fact into the matching link traffic.
    ///
    /// Returns the send or transfer error when the link refused it; the
    /// caller decides whether that matters (usually it does not).
    pub fn handle_device_event(
        &mut self,
        event: DeviceEvent,
        now_ms: u64,
        delay: &mut impl DelayNs,
    ) -> Result<()> {
        match event {
            DeviceEvent::WakeWordDetected => {
                self.messenger.send_command(
                    &mut self.transport,
                    &self.link,
                    now_ms,
                    Command::StartRecording,
                    "wake_word",
                )?;
            }
            DeviceEvent::RecordingComplete(audio) => {
                let chunks =
                    self.messenger
                        .send_audio(&mut self.transport, &self.link, delay, &audio)?;
                info!("recording delivered in {chunks} chunks");
                self.messenger.send_status(
                    &mut self.transport,
                    &self.link,
                    now_ms,
                    Status::Ready,
                    "",
                )?;
            }
            DeviceEvent::Gesture(tag) => {
                let data = format!("gesture:{tag}");
                self.messenger.send_status(
                    &mut self.transport,
                    &self.link,
                    now_ms,
                    Status::Ready,
                    &data,
                )?;
            }
            DeviceEvent::LowBattery { volts } => {
                let data = format!("{volts:.2}");
                self.messenger.send_status(
                    &mut self.transport,
                    &self.link,
                    now_ms,
                    Status::LowBattery,
                    &data,
                )?;
            }
            DeviceEvent::LongPress => {
                if self.link.is_connected() {
                    info!("long press: disconnecting");
                    self.link.request_disconnect(now_ms);
                } else if self.link.state() == ConnectionState::Error {
                    info!("long press: clearing link error, re-advertising");
                    self.link.reset(now_ms);
                    self.link.request_reconnect(now_ms);
                } else {
                    info!("long press: re-advertising");
                    self.link.request_reconnect(now_ms);
                }
                self.apply_radio_requests();
            }
        }
        Ok(())
    }

    // ── Direct messaging ──────────────────────────────────────

    pub fn send_command(&mut self, now_ms: u64, command: Command, data: &str) -> Result<()> {
        self.messenger
            .send_command(&mut self.transport, &self.link, now_ms, command, data)?;
        Ok(())
    }

    pub fn send_status(&mut self, now_ms: u64, status: Status, data: &str) -> Result<()> {
        self.messenger
            .send_status(&mut self.transport, &self.link, now_ms, status, data)?;
        Ok(())
    }

    pub fn send_error(&mut self, now_ms: u64, code: ErrorCode, description: &str) -> Result<()> {
        self.messenger
            .send_error(&mut self.transport, &self.link, now_ms, code, description)?;
        Ok(())
    }

    // ── Link control ──────────────────────────────────────────

    /// Recover from `Error` after the user or a supervisor asks for it.
    pub fn reset_link(&mut self, now_ms: u64) {
        self.link.reset(now_ms);
        self.apply_radio_requests();
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn link_state(&self) -> ConnectionState {
        self.link.state()
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    pub fn link(&self) -> &LinkManager {
        &self.link
    }

    pub fn link_stats(&self, now_ms: u64) -> LinkStats {
        self.link.stats(now_ms)
    }

    pub fn messenger_stats(&self) -> MessengerStats {
        self.messenger.stats()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}
