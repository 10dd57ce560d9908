//! Monotonic millisecond clock for the link core.
//!
//! Readings are relative to the moment the clock was built, so the link
//! state machine starts its timers near zero regardless of how long the
//! bootloader and NVS init took. On device the source is the ESP-IDF
//! high-resolution timer; on the host it is `std::time::Instant`.

use crate::app::ports::Clock;

pub struct Esp32Clock {
    origin_us: u64,
}

impl Default for Esp32Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32Clock {
    pub fn new() -> Self {
        Self {
            origin_us: platform_now_us(),
        }
    }

    /// Microseconds since this clock was created.
    pub fn elapsed_us(&self) -> u64 {
        platform_now_us().saturating_sub(self.origin_us)
    }
}

impl Clock for Esp32Clock {
    fn now_ms(&self) -> u64 {
        self.elapsed_us() / 1_000
    }
}

#[cfg(target_os = "espidf")]
fn platform_now_us() -> u64 {
    (unsafe { esp_idf_svc::sys::esp_timer_get_time() }).max(0) as u64
}

#[cfg(not(target_os = "espidf"))]
fn platform_now_us() -> u64 {
    use std::sync::OnceLock;
    use std::time::Instant;

    static PROCESS_START: OnceLock<Instant> = OnceLock::new();
    PROCESS_START.get_or_init(Instant::now).elapsed().as_micros() as u64
}
