//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter         | Implements                   | Connects to               |
//! |-----------------|------------------------------|---------------------------|
//! | `ble_transport` | LinkTransport                | Bluedroid GATT server     |
//! | `gauges`        | SystemGauges                 | Heap allocator, battery ADC |
//! | `log_sink`      | LinkListener, CommandHandler | Serial log output         |
//! | `nvs`           | ConfigPort                   | NVS / in-memory store     |
//! | `time`          | Clock                        | ESP32 system timer        |
//!
//! `device_id` is a plain value type: MAC-derived message id prefix and BLE name.

pub mod ble_transport;
pub mod device_id;
pub mod gauges;
pub mod log_sink;
pub mod nvs;
pub mod time;
