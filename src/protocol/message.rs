//! Message model: one closed variant per message kind.
//!
//! Each [`MessageBody`] variant carries only the fields valid for its kind,
//! so a status message with an error code (or a heartbeat with a command)
//! cannot be represented.  The wire vocabulary below is the compatibility
//! contract with the mobile host and must not change.

extern crate alloc;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

// ---------------------------------------------------------------------------
// Message kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Command,
    Status,
    AudioData,
    Heartbeat,
    Error,
    Ack,
}

impl MessageKind {
    pub const ALL: [MessageKind; 6] = [
        Self::Command,
        Self::Status,
        Self::AudioData,
        Self::Heartbeat,
        Self::Error,
        Self::Ack,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::Status => "status",
            Self::AudioData => "audio_data",
            Self::Heartbeat => "heartbeat",
            Self::Error => "error",
            Self::Ack => "ack",
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

// ---------------------------------------------------------------------------
// Command vocabulary (host-owned)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    StartRecording,
    StopRecording,
    HapticFeedback,
    SetSensitivity,
    Calibrate,
    Sleep,
    Wake,
    Reset,
}

impl Command {
    pub const ALL: [Command; 8] = [
        Self::StartRecording,
        Self::StopRecording,
        Self::HapticFeedback,
        Self::SetSensitivity,
        Self::Calibrate,
        Self::Sleep,
        Self::Wake,
        Self::Reset,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::StartRecording => "start_recording",
            Self::StopRecording => "stop_recording",
            Self::HapticFeedback => "haptic_feedback",
            Self::SetSensitivity => "set_sensitivity",
            Self::Calibrate => "calibrate",
            Self::Sleep => "sleep",
            Self::Wake => "wake",
            Self::Reset => "reset",
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

// ---------------------------------------------------------------------------
// Status vocabulary (device-owned)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Ready,
    Recording,
    Processing,
    LowBattery,
    Error,
    Disconnected,
}

impl Status {
    pub const ALL: [Status; 6] = [
        Self::Ready,
        Self::Recording,
        Self::Processing,
        Self::LowBattery,
        Self::Error,
        Self::Disconnected,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Recording => "recording",
            Self::Processing => "processing",
            Self::LowBattery => "low_battery",
            Self::Error => "error",
            Self::Disconnected => "disconnected",
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|st| st.as_str() == s)
    }
}

// ---------------------------------------------------------------------------
// Error codes
// ---------------------------------------------------------------------------

/// Numeric error codes with fixed human-readable defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCode {
    AudioInit = 1,
    BleInit = 2,
    HapticInit = 3,
    AccelInit = 4,
    LowMemory = 5,
    InvalidCommand = 6,
    Timeout = 7,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 7] = [
        Self::AudioInit,
        Self::BleInit,
        Self::HapticInit,
        Self::AccelInit,
        Self::LowMemory,
        Self::InvalidCommand,
        Self::Timeout,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|e| u64::from(e.code()) == code)
    }

    pub fn default_description(self) -> &'static str {
        match self {
            Self::AudioInit => "Failed to initialize audio system",
            Self::BleInit => "Failed to initialize Bluetooth",
            Self::HapticInit => "Failed to initialize haptic feedback",
            Self::AccelInit => "Failed to initialize accelerometer",
            Self::LowMemory => "Insufficient memory available",
            Self::InvalidCommand => "Invalid command received",
            Self::Timeout => "Operation timed out",
        }
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    Command { command: Command, data: String },
    Status { status: Status, data: String },
    AudioData { data: Vec<u8> },
    Heartbeat { uptime_ms: u64, free_heap: u32 },
    Error { code: ErrorCode, description: String },
    Ack { ack_id: String },
}

impl MessageBody {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Command { .. } => MessageKind::Command,
            Self::Status { .. } => MessageKind::Status,
            Self::AudioData { .. } => MessageKind::AudioData,
            Self::Heartbeat { .. } => MessageKind::Heartbeat,
            Self::Error { .. } => MessageKind::Error,
            Self::Ack { .. } => MessageKind::Ack,
        }
    }
}

/// A protocol message: envelope plus kind-specific body.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// `"<device-prefix>_<counter>"`; may be empty on inbound messages.
    pub id: String,
    /// Device time at creation (ms since boot).
    pub timestamp: u64,
    /// Battery voltage at creation, when known.
    pub battery: Option<f32>,
    pub body: MessageBody,
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        self.body.kind()
    }
}

// ---------------------------------------------------------------------------
// Id generation
// ---------------------------------------------------------------------------

/// Per-boot message id source.  The counter only ever increases.
pub struct MessageIdGen {
    prefix: String,
    counter: u32,
}

impl MessageIdGen {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: 0,
        }
    }

    pub fn next_id(&mut self) -> String {
        self.counter = self.counter.wrapping_add(1);
        format!("{}_{}", self.prefix, self.counter)
    }
}
