//! Log-based listener and handler adapters.
//!
//! [`LogLinkListener`] writes link lifecycle notifications and
//! [`LogCommandHandler`] writes dispatched host messages to the ESP-IDF
//! logger (UART / USB-CDC in production).  The haptic, audio and
//! gesture subsystems implement the same traits on device.

use log::{info, warn};

use crate::app::ports::{CommandHandler, LinkListener};
use crate::link::LinkEvent;
use crate::protocol::{Command, ErrorCode, Status};

/// Adapter that logs every [`LinkEvent`] to the serial console.
#[derive(Default)]
pub struct LogLinkListener {
    failures: u32,
}

impl LogLinkListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times the link gave up and entered `Error`.
    pub fn failures(&self) -> u32 {
        self.failures
    }
}

impl LinkListener for LogLinkListener {
    fn on_link_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Connected => info!("LINK | event=connected"),
            LinkEvent::Disconnected => info!("LINK | event=disconnected"),
            LinkEvent::Reconnecting => info!("LINK | event=reconnecting"),
            LinkEvent::Failed => {
                self.failures = self.failures.wrapping_add(1);
                warn!("LINK | event=failed | total={}", self.failures);
            }
        }
    }
}

/// Adapter that logs every host message instead of acting on it.
#[derive(Default)]
pub struct LogCommandHandler;

impl CommandHandler for LogCommandHandler {
    fn on_command(&mut self, command: Command, data: &str) {
        info!("CMD | command={} | data={}", command.as_str(), data);
    }

    fn on_peer_status(&mut self, status: Status, data: &str) {
        info!("PEER | status={} | data={}", status.as_str(), data);
    }

    fn on_peer_error(&mut self, code: ErrorCode, description: &str) {
        warn!("PEER | error_code={} | description={}", code.code(), description);
    }

    fn on_ack(&mut self, ack_id: &str) {
        info!("PEER | ack_id={}", ack_id);
    }
}
