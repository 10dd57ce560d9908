//! BIL wearable firmware library.
//!
//! Exposes the link core (state machine, codec, messaging) and its
//! adapters for integration testing and fuzzing. All ESP-IDF-specific
//! code is guarded by `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod link;
pub mod protocol;

pub mod adapters;
