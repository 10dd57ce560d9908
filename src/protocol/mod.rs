//! Message protocol between the wearable and the mobile host.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Protocol Stack                          │
//! │                                                              │
//! │  ┌───────────┐   ┌──────────┐   ┌──────────────────────────┐ │
//! │  │ Transport │──▶│  Codec   │──▶│  Messenger (dispatch)    │ │
//! │  │ (trait)   │   │  (JSON)  │   │  → CommandHandler        │ │
//! │  └───────────┘   └──────────┘   └──────────────────────────┘ │
//! │       ▲                                    │                 │
//! │       │              ┌─────────────────────┘                 │
//! │       │              ▼                                       │
//! │  ┌───────────┐   ┌──────────┐                                │
//! │  │ Transport │◀──│ Chunked  │   (audio payloads)             │
//! │  │ (notify)  │   │ transfer │                                │
//! │  └───────────┘   └──────────┘                                │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod chunked;
pub mod codec;
pub mod message;
pub mod messenger;

pub use codec::{decode, encode};
pub use message::{Command, ErrorCode, Message, MessageBody, MessageIdGen, MessageKind, Status};
pub use messenger::{InboundOutcome, Messenger, MessengerStats};
