//! Fuzz target: `protocol::decode` and the messenger inbound path
//!
//! Drives arbitrary byte sequences into the JSON message decoder and the
//! full inbound dispatch, asserting that neither panics, that every
//! accepted record re-encodes to something that decodes to the same
//! message, and that every reply the device emits is itself decodable.
//!
//! cargo fuzz run fuzz_message_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use wearable::app::ports::CommandHandler;
use wearable::config::LinkConfig;
use wearable::link::transport::{Channel, LinkTransport, TransportEvent};
use wearable::link::LinkStatus;
use wearable::protocol::{decode, encode, Command, Messenger};

struct AlwaysUp;

impl LinkStatus for AlwaysUp {
    fn is_connected(&self) -> bool {
        true
    }

    fn heartbeat_interval_ms(&self) -> u32 {
        30_000
    }
}

#[derive(Default)]
struct Capture {
    writes: Vec<Vec<u8>>,
}

impl LinkTransport for Capture {
    type Error = ();

    fn send(&mut self, _channel: Channel, bytes: &[u8]) -> Result<(), ()> {
        self.writes.push(bytes.to_vec());
        Ok(())
    }

    fn has_channel(&self, _channel: Channel) -> bool {
        true
    }

    fn is_peer_attached(&self) -> bool {
        true
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

struct Ignore;

impl CommandHandler for Ignore {
    fn on_command(&mut self, _command: Command, _data: &str) {}
}

fuzz_target!(|data: &[u8]| {
    // Decoding never yields a partial message: accepted input is stable.
    if let Ok(msg) = decode(data) {
        let again = decode(&encode(&msg)).expect("re-encoded message must decode");
        assert_eq!(again.kind(), msg.kind());
        assert_eq!(again.body, msg.body);
    }

    let config = LinkConfig {
        ack_commands: true,
        ..LinkConfig::default()
    };
    let mut messenger = Messenger::new(&config, "FUZZ");
    let mut transport = Capture::default();
    let _ = messenger.handle_inbound(
        &mut transport,
        &AlwaysUp,
        &mut Ignore,
        1_000,
        50_000,
        Channel::Status,
        data,
    );
    for reply in &transport.writes {
        assert!(decode(reply).is_ok(), "device reply must decode");
    }
});
