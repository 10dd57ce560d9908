//! Unified error types for the wearable firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! composition root's error handling uniform.  All variants are `Copy` so
//! they can be passed through the link core without allocation.
//!
//! Transient link conditions (not connected, attempt timeout, heartbeat
//! timeout) are not errors at all: the state machine absorbs them.  What
//! remains here is what a caller can observe and act upon.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An outbound message could not be handed to the transport.
    Send(SendError),
    /// A chunked audio transfer was aborted.
    Transfer(TransferError),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Send(e) => write!(f, "send: {e}"),
            Self::Transfer(e) => write!(f, "transfer: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Decode errors
// ---------------------------------------------------------------------------

/// Why a wire record was rejected.  Decoding never yields a partial message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Not valid UTF-8 / JSON, or not a JSON object.
    Malformed,
    /// The `type` field is absent or names no known message kind.
    UnknownKind,
    /// A field the message kind requires is absent.
    MissingField(&'static str),
    /// A field is present but has the wrong JSON type or an invalid value.
    InvalidField(&'static str),
    /// A well-formed command message names a command outside the vocabulary.
    UnknownCommand,
    /// A well-formed status message names a status outside the vocabulary.
    UnknownStatus,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed record"),
            Self::UnknownKind => write!(f, "unknown message type"),
            Self::MissingField(name) => write!(f, "missing field '{name}'"),
            Self::InvalidField(name) => write!(f, "invalid field '{name}'"),
            Self::UnknownCommand => write!(f, "unknown command"),
            Self::UnknownStatus => write!(f, "unknown status"),
        }
    }
}

// ---------------------------------------------------------------------------
// Send errors
// ---------------------------------------------------------------------------

/// Outcome of a refused send.  `NotConnected` is the common, expected case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    /// The state machine does not report `Connected`.
    NotConnected,
    /// The transport does not expose the requested channel.
    ChannelUnavailable,
    /// The transport refused the write.
    WriteFailed,
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "link not connected"),
            Self::ChannelUnavailable => write!(f, "channel unavailable"),
            Self::WriteFailed => write!(f, "channel write failed"),
        }
    }
}

impl From<SendError> for Error {
    fn from(e: SendError) -> Self {
        Self::Send(e)
    }
}

// ---------------------------------------------------------------------------
// Transfer errors
// ---------------------------------------------------------------------------

/// Why a chunked audio transfer stopped early.  Remaining bytes are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferError {
    /// The link was not usable before the first chunk.
    NotConnected,
    /// The link left `Connected` after `sent` chunks went out.
    LinkLost { sent: usize },
    /// The audio channel refused chunk number `sent`.
    ChunkWriteFailed { sent: usize },
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "link not connected"),
            Self::LinkLost { sent } => write!(f, "link lost after {sent} chunks"),
            Self::ChunkWriteFailed { sent } => {
                write!(f, "chunk write failed after {sent} chunks")
            }
        }
    }
}

impl From<TransferError> for Error {
    fn from(e: TransferError) -> Self {
        Self::Transfer(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
