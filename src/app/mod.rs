//! Application core: link and messaging orchestration, zero direct I/O.
//!
//! The composition root [`service::WearableService`] owns the connection
//! state machine and the messaging core and drives them from a single tick.
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`].

pub mod events;
pub mod ports;
pub mod service;
