//! Mock adapters for integration tests.
//!
//! Records every transport call so tests can assert on the full wire
//! history without a real radio.

use std::collections::VecDeque;

use embedded_hal::delay::DelayNs;
use wearable::app::ports::{CommandHandler, LinkListener, SystemGauges};
use wearable::app::service::WearableService;
use wearable::config::LinkConfig;
use wearable::link::transport::{Channel, LinkTransport, TransportEvent};
use wearable::link::LinkEvent;
use wearable::protocol::{decode, Command, ErrorCode, Message, Status};

// ── Transport call record ─────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum RadioCall {
    StartAdvertising,
    StopAdvertising,
    DisconnectPeer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockTransportError;

// ── MockTransport ─────────────────────────────────────────────

pub struct MockTransport {
    pub writes: Vec<(Channel, Vec<u8>)>,
    pub radio: Vec<RadioCall>,
    pub attached: bool,
    /// Detach the peer once this many audio chunks went out.
    pub detach_after_audio: Option<usize>,
    /// Refuse every write on this channel.
    pub failing_channel: Option<Channel>,
    events: VecDeque<TransportEvent>,
}

#[allow(dead_code)]
impl MockTransport {
    pub fn new() -> Self {
        Self {
            writes: Vec::new(),
            radio: Vec::new(),
            attached: false,
            detach_after_audio: None,
            failing_channel: None,
            events: VecDeque::new(),
        }
    }

    pub fn attach(&mut self) {
        self.attached = true;
        self.events.push_back(TransportEvent::PeerAttached);
    }

    pub fn detach(&mut self) {
        self.attached = false;
        self.events.push_back(TransportEvent::PeerDetached);
    }

    pub fn handshake(&mut self) {
        self.events.push_back(TransportEvent::Handshake);
    }

    pub fn host_writes(&mut self, channel: Channel, bytes: &[u8]) {
        self.events.push_back(TransportEvent::BytesReceived {
            channel,
            bytes: bytes.to_vec(),
        });
    }

    pub fn host_writes_json(&mut self, json: &str) {
        self.host_writes(Channel::Status, json.as_bytes());
    }

    /// Writes on `channel`, decoded.  Audio chunks are skipped.
    pub fn messages_on(&self, channel: Channel) -> Vec<Message> {
        self.writes
            .iter()
            .filter(|(ch, _)| *ch == channel && *ch != Channel::Audio)
            .map(|(_, bytes)| decode(bytes).expect("device emitted undecodable record"))
            .collect()
    }

    pub fn audio_chunks(&self) -> Vec<&[u8]> {
        self.writes
            .iter()
            .filter(|(ch, _)| *ch == Channel::Audio)
            .map(|(_, bytes)| bytes.as_slice())
            .collect()
    }

    pub fn clear_writes(&mut self) {
        self.writes.clear();
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkTransport for MockTransport {
    type Error = MockTransportError;

    fn send(&mut self, channel: Channel, bytes: &[u8]) -> Result<(), MockTransportError> {
        if self.failing_channel == Some(channel) {
            return Err(MockTransportError);
        }
        self.writes.push((channel, bytes.to_vec()));
        if channel == Channel::Audio {
            if let Some(limit) = self.detach_after_audio {
                if self.audio_chunks().len() >= limit {
                    self.detach();
                }
            }
        }
        Ok(())
    }

    fn has_channel(&self, _channel: Channel) -> bool {
        true
    }

    fn is_peer_attached(&self) -> bool {
        self.attached
    }

    fn start_advertising(&mut self) -> Result<(), MockTransportError> {
        self.radio.push(RadioCall::StartAdvertising);
        Ok(())
    }

    fn stop_advertising(&mut self) -> Result<(), MockTransportError> {
        self.radio.push(RadioCall::StopAdvertising);
        Ok(())
    }

    fn disconnect_peer(&mut self) -> Result<(), MockTransportError> {
        self.radio.push(RadioCall::DisconnectPeer);
        if self.attached {
            self.detach();
        }
        Ok(())
    }

    fn poll_event(&mut self) -> Option<TransportEvent> {
        self.events.pop_front()
    }
}

// ── Recording ports ───────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    Command(Command, String),
    PeerStatus(Status, String),
    PeerError(ErrorCode, String),
    Ack(String),
}

#[derive(Default)]
pub struct RecordingHandler {
    pub calls: Vec<HostCall>,
}

impl CommandHandler for RecordingHandler {
    fn on_command(&mut self, command: Command, data: &str) {
        self.calls.push(HostCall::Command(command, data.into()));
    }

    fn on_peer_status(&mut self, status: Status, data: &str) {
        self.calls.push(HostCall::PeerStatus(status, data.into()));
    }

    fn on_peer_error(&mut self, code: ErrorCode, description: &str) {
        self.calls.push(HostCall::PeerError(code, description.into()));
    }

    fn on_ack(&mut self, ack_id: &str) {
        self.calls.push(HostCall::Ack(ack_id.into()));
    }
}

#[derive(Default)]
pub struct RecordingListener {
    pub events: Vec<LinkEvent>,
}

impl LinkListener for RecordingListener {
    fn on_link_event(&mut self, event: LinkEvent) {
        self.events.push(event);
    }
}

pub struct FixedGauges {
    pub free_heap: u32,
    pub battery: Option<f32>,
    pub status: Status,
}

impl Default for FixedGauges {
    fn default() -> Self {
        Self {
            free_heap: 123_456,
            battery: Some(3.9),
            status: Status::Ready,
        }
    }
}

impl SystemGauges for FixedGauges {
    fn free_heap(&self) -> u32 {
        self.free_heap
    }

    fn battery_volts(&self) -> Option<f32> {
        self.battery
    }

    fn current_status(&self) -> Status {
        self.status
    }
}

/// Records every pacing pause instead of sleeping.
#[derive(Default)]
pub struct RecordingDelay {
    pub pauses_ms: Vec<u32>,
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, _ns: u32) {}

    fn delay_ms(&mut self, ms: u32) {
        self.pauses_ms.push(ms);
    }
}

// ── Harness ───────────────────────────────────────────────────

pub struct Harness {
    pub svc: WearableService<MockTransport>,
    pub handler: RecordingHandler,
    pub listener: RecordingListener,
    pub gauges: FixedGauges,
    pub now: u64,
}

#[allow(dead_code)]
impl Harness {
    pub fn new() -> Self {
        Self::with_config(LinkConfig::default())
    }

    pub fn with_config(config: LinkConfig) -> Self {
        let mut svc = WearableService::new(&config, "BIL-1B3C5D", MockTransport::new());
        svc.start(0);
        Self {
            svc,
            handler: RecordingHandler::default(),
            listener: RecordingListener::default(),
            gauges: FixedGauges::default(),
            now: 0,
        }
    }

    pub fn tick_at(&mut self, now: u64) {
        self.now = now;
        self.svc
            .tick(now, &mut self.handler, &mut self.listener, &self.gauges);
    }

    pub fn tick_after(&mut self, ms: u64) {
        self.tick_at(self.now + ms);
    }

    pub fn transport(&mut self) -> &mut MockTransport {
        self.svc.transport_mut()
    }

    /// Boot → Reconnecting → Advertising → peer attaches → Connected.
    /// Leaves the clock at 2 500 ms with an empty write log.
    pub fn connect(&mut self) {
        self.tick_at(1_000);
        self.tick_at(2_000);
        self.transport().attach();
        self.tick_at(2_500);
        assert!(self.svc.is_connected(), "harness failed to connect");
        self.transport().clear_writes();
        self.listener.events.clear();
    }
}
