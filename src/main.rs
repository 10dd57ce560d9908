//! BIL Wearable Firmware: Main Entry Point
//!
//! Builds the composition root once and drives it at a fixed cadence.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  BleLinkTransport   LogLinkListener   NvsConfigStore           │
//! │  (LinkTransport)    LogCommandHandler (ConfigPort)             │
//! │  GaugesAdapter      Esp32Clock                                 │
//! │  (SystemGauges)     (Clock)                                    │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            WearableService (pure logic)                │    │
//! │  │  LinkManager (FSM · backoff · heartbeat) · Messenger   │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_hal::delay::FreeRtos;
use log::{info, warn};

use wearable::adapters::ble_transport::BleLinkTransport;
use wearable::adapters::device_id::DeviceIdentity;
use wearable::adapters::gauges::GaugesAdapter;
use wearable::adapters::log_sink::{LogCommandHandler, LogLinkListener};
use wearable::adapters::nvs::NvsConfigStore;
use wearable::adapters::time::Esp32Clock;
use wearable::app::ports::{Clock, ConfigPort};
use wearable::app::service::WearableService;
use wearable::config::LinkConfig;

/// Scheduling cadence of the main loop.
const TICK_MS: u32 = 50;

/// Link statistics are logged every this many ticks (one minute).
const STATS_EVERY_TICKS: u64 = 60_000 / TICK_MS as u64;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  BIL Wearable v{}                    ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let config = match NvsConfigStore::new() {
        Ok(nvs) => nvs.load().unwrap_or_else(|e| {
            warn!("NVS config load failed ({}), using defaults", e);
            LinkConfig::default()
        }),
        Err(e) => {
            warn!("NVS init failed ({}), running with defaults", e);
            LinkConfig::default()
        }
    };

    // ── 3. Device identity ────────────────────────────────────
    let identity = DeviceIdentity::detect();
    info!("Device: {}", identity);

    // ── 4. Construct adapters ─────────────────────────────────
    let mut transport = BleLinkTransport::new(identity.ble_name());
    transport
        .init()
        .map_err(|e| anyhow::anyhow!("BLE init failed: {e}"))?;

    let clock = Esp32Clock::new();
    let gauges = GaugesAdapter::new();
    let mut listener = LogLinkListener::new();
    let mut handler = LogCommandHandler;

    // ── 5. Composition root ───────────────────────────────────
    let mut service = WearableService::new(&config, identity.id(), transport);
    service.start(clock.now_ms());

    info!("System ready. Entering event loop.");

    // ── 6. Event loop ─────────────────────────────────────────
    loop {
        let now = clock.now_ms();
        service.tick(now, &mut handler, &mut listener, &gauges);

        if service.tick_count() % STATS_EVERY_TICKS == 0 {
            let s = service.link_stats(now);
            let m = service.messenger_stats();
            info!(
                "STATS | state={} | attempts={} | backoff={}ms | up={}ms | tx={} rx={} rejected={}",
                s.state,
                s.reconnect_attempts,
                s.backoff_interval_ms,
                s.connection_duration_ms,
                m.messages_sent,
                m.messages_received,
                m.messages_rejected,
            );
        }

        FreeRtos::delay_ms(TICK_MS);
    }
}
