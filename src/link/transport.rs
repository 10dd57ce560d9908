//! Transport abstraction: the radio link as a set of logical channels.
//!
//! Concrete implementations:
//! - BLE GATT service with one characteristic per channel (notify + write)
//! - In-memory mocks in the integration tests
//!
//! The messaging core is generic over `LinkTransport`, so swapping the
//! radio requires zero changes to the link or protocol logic.

extern crate alloc;
use alloc::vec::Vec;

/// Logical channel on the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Device → host audio chunks.
    Audio,
    /// Device → host commands and acks.
    Command,
    /// Bidirectional status: device reports out, host messages in.
    Status,
}

impl Channel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Command => "command",
            Self::Status => "status",
        }
    }
}

/// Asynchronous input observed by the transport since the last poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    PeerAttached,
    PeerDetached,
    /// The radio began a connection handshake.
    Handshake,
    BytesReceived { channel: Channel, bytes: Vec<u8> },
}

/// Channel-oriented link transport.
pub trait LinkTransport {
    /// Error type for this transport.
    type Error: core::fmt::Debug;

    /// Write `bytes` on `channel` and notify the peer.
    fn send(&mut self, channel: Channel, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Whether the channel exists and can currently carry a write.
    fn has_channel(&self, channel: Channel) -> bool;

    /// Whether a peer is attached at the radio level right now.
    fn is_peer_attached(&self) -> bool;

    /// Begin advertising so a peer can find the device.
    fn start_advertising(&mut self) -> Result<(), Self::Error>;

    /// Stop advertising.  Idempotent.
    fn stop_advertising(&mut self) -> Result<(), Self::Error>;

    /// Tear down the current peer connection, if any.
    fn disconnect_peer(&mut self) -> Result<(), Self::Error>;

    /// Next pending event, or `None` when nothing happened.  Never blocks.
    fn poll_event(&mut self) -> Option<TransportEvent>;
}

/// A transport with no radio: every write is refused and nothing arrives.
/// Stands in while the real radio is unavailable.
pub struct NullTransport;

impl LinkTransport for NullTransport {
    type Error = ();

    fn send(&mut self, _channel: Channel, _bytes: &[u8]) -> Result<(), ()> {
        Err(())
    }

    fn has_channel(&self, _channel: Channel) -> bool {
        false
    }

    fn is_peer_attached(&self) -> bool {
        false
    }

    fn start_advertising(&mut self) -> Result<(), ()> {
        Ok(())
    }

    fn stop_advertising(&mut self) -> Result<(), ()> {
        Ok(())
    }

    fn disconnect_peer(&mut self) -> Result<(), ()> {
        Ok(())
    }

    fn poll_event(&mut self) -> Option<TransportEvent> {
        None
    }
}
