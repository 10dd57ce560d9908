//! Inbound device events.
//!
//! The sensing subsystems (wake-word detector, gesture classifier, button
//! handler, battery monitor) each reduce their work to one of these facts
//! and hand it to [`WearableService::handle_device_event`](super::service::WearableService::handle_device_event).
//! None of them build wire bytes or reason about connectivity.

extern crate alloc;
use alloc::string::String;
use alloc::vec::Vec;

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    /// The wake word was heard; recording is about to start.
    WakeWordDetected,

    /// A recording finished; carries the raw audio payload.
    RecordingComplete(Vec<u8>),

    /// The gesture classifier recognised a gesture (free-form tag).
    Gesture(String),

    /// Battery dropped below the warning threshold.
    LowBattery { volts: f32 },

    /// The user held the button: toggle the link.
    LongPress,
}
