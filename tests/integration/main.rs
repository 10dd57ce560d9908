//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters.  All tests run on the host (x86_64) with no
//! real radio required.

mod ble_sim_tests;
mod device_event_tests;
mod link_lifecycle_tests;
mod messaging_tests;
mod mock_link;
