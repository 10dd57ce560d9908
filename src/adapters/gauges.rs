//! System gauges adapter.
//!
//! Implements [`SystemGauges`]: free heap from the ESP-IDF allocator and
//! the battery voltage from the last ADC sample handed in by the caller.
//! On non-espidf targets the heap figure is a fixed simulation value.

use crate::app::ports::SystemGauges;
use crate::protocol::Status;

/// 12-bit ADC full scale.
const ADC_MAX: f32 = 4095.0;
/// ADC reference voltage.
const ADC_VREF: f32 = 3.3;
/// Below this the device reports `low_battery`.
pub const LOW_BATTERY_VOLTS: f32 = 3.0;

#[cfg(not(target_os = "espidf"))]
const SIM_FREE_HEAP: u32 = 180_000;

pub struct GaugesAdapter {
    battery_volts: Option<f32>,
    status: Status,
}

impl Default for GaugesAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl GaugesAdapter {
    pub fn new() -> Self {
        Self {
            battery_volts: None,
            status: Status::Ready,
        }
    }

    /// Record a raw 12-bit battery ADC sample.
    pub fn record_battery_raw(&mut self, raw: u16) -> f32 {
        let volts = f32::from(raw.min(4095)) * ADC_VREF / ADC_MAX;
        self.battery_volts = Some(volts);
        volts
    }

    pub fn is_battery_low(&self) -> bool {
        self.battery_volts.is_some_and(|v| v < LOW_BATTERY_VOLTS)
    }

    /// Activity status reported while the battery is healthy.
    pub fn set_status(&mut self, status: Status) {
        self.status = status;
    }
}

impl SystemGauges for GaugesAdapter {
    #[cfg(target_os = "espidf")]
    fn free_heap(&self) -> u32 {
        unsafe { esp_idf_svc::sys::esp_get_free_heap_size() }
    }

    #[cfg(not(target_os = "espidf"))]
    fn free_heap(&self) -> u32 {
        SIM_FREE_HEAP
    }

    fn battery_volts(&self) -> Option<f32> {
        self.battery_volts
    }

    fn current_status(&self) -> Status {
        if self.is_battery_low() {
            Status::LowBattery
        } else {
            self.status
        }
    }
}
