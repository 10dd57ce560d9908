//! BLE GATT link transport.
//!
//! Implements [`LinkTransport`] over one primary GATT service with one
//! characteristic per logical [`Channel`].
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: Bluedroid GATT server via the raw
//!   `esp_idf_svc::sys` bindings.  Bluedroid callbacks push
//!   [`TransportEvent`]s into a static queue that [`poll_event`] drains.
//! - **all other targets**: an in-memory radio.  Tests drive it with the
//!   `simulate_*` helpers and inspect notifications with [`take_sent`].
//!
//! ## GATT Service Layout
//!
//! | Characteristic | UUID                          | Perms         | Direction      |
//! |----------------|-------------------------------|---------------|----------------|
//! | Audio          | `6e400002-…-e50e24dcca9e`     | Notify        | device → host  |
//! | Command        | `6e400003-…-e50e24dcca9e`     | Notify        | device → host  |
//! | Status         | `6e400004-…-e50e24dcca9e`     | Read+Write+Notify | both       |
//!
//! [`poll_event`]: LinkTransport::poll_event
//! [`take_sent`]: BleLinkTransport::take_sent

extern crate alloc;
use alloc::vec::Vec;

use core::fmt;
use log::{info, warn};

use crate::link::transport::{Channel, LinkTransport, TransportEvent};

// ───────────────────────────────────────────────────────────────
// Constants
// ───────────────────────────────────────────────────────────────

pub const SERVICE_UUID: u128 = 0x6e400001_b5a3_f393_e0a9_e50e24dcca9e;
pub const CHAR_AUDIO: u128 = 0x6e400002_b5a3_f393_e0a9_e50e24dcca9e;
pub const CHAR_COMMAND: u128 = 0x6e400003_b5a3_f393_e0a9_e50e24dcca9e;
pub const CHAR_STATUS: u128 = 0x6e400004_b5a3_f393_e0a9_e50e24dcca9e;

/// Largest value a single notification may carry (negotiated MTU ceiling).
pub const MAX_NOTIFY_LEN: usize = 512;

/// Radio events buffered between two polls.
const EVENT_QUEUE_CAP: usize = 16;

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BleTransportError {
    StackInitFailed,
    NotAttached,
    ChannelMissing(Channel),
    PayloadTooLarge(usize),
    /// Bluedroid returned a non-`ESP_OK` code.
    Stack(i32),
}

impl fmt::Display for BleTransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StackInitFailed => write!(f, "BLE stack initialisation failed"),
            Self::NotAttached => write!(f, "no central attached"),
            Self::ChannelMissing(ch) => write!(f, "{} characteristic not registered", ch.as_str()),
            Self::PayloadTooLarge(len) => {
                write!(f, "notification of {len} B exceeds {MAX_NOTIFY_LEN} B")
            }
            Self::Stack(code) => write!(f, "Bluedroid error {code}"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF Bluedroid glue
// ───────────────────────────────────────────────────────────────
//
// Bluedroid callbacks are C function pointers that cannot capture Rust
// closures.  These statics bridge the callback context to the transport.

#[cfg(target_os = "espidf")]
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering as AtomicOrdering};

#[cfg(target_os = "espidf")]
static BLE_GATTS_IF: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_CONN_ID: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_ATTACHED: AtomicBool = AtomicBool::new(false);
#[cfg(target_os = "espidf")]
static BLE_SVC_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_AUDIO_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_COMMAND_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_STATUS_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_CHAR_STEP: AtomicU32 = AtomicU32::new(0);

// GATTS callbacks run in the Bluedroid task (not ISR), so std Mutex is safe.
#[cfg(target_os = "espidf")]
static BLE_PENDING: std::sync::Mutex<heapless::Deque<TransportEvent, EVENT_QUEUE_CAP>> =
    std::sync::Mutex::new(heapless::Deque::new());

#[cfg(target_os = "espidf")]
fn push_pending(event: TransportEvent) {
    if let Ok(mut queue) = BLE_PENDING.lock() {
        if queue.push_back(event).is_err() {
            log::warn!("BLE: event queue full, event dropped");
        }
    }
}

#[cfg(target_os = "espidf")]
fn uuid128_to_esp(uuid: u128) -> esp_idf_svc::sys::esp_bt_uuid_t {
    let mut t: esp_idf_svc::sys::esp_bt_uuid_t = unsafe { core::mem::zeroed() };
    t.len = 16;
    unsafe {
        t.uuid.uuid128 = uuid.to_le_bytes();
    }
    t
}

#[cfg(target_os = "espidf")]
unsafe fn add_gatt_char(svc_handle: u16, uuid: u128, perm: u32, prop: u32) {
    use esp_idf_svc::sys::*;
    let mut char_uuid = uuid128_to_esp(uuid);
    unsafe {
        esp_ble_gatts_add_char(
            svc_handle,
            &mut char_uuid,
            perm as esp_gatt_perm_t,
            prop as esp_gatt_char_prop_t,
            core::ptr::null_mut(),
            core::ptr::null_mut(),
        );
    }
}

#[cfg(target_os = "espidf")]
fn channel_handle(channel: Channel) -> u32 {
    match channel {
        Channel::Audio => BLE_AUDIO_HANDLE.load(AtomicOrdering::Relaxed),
        Channel::Command => BLE_COMMAND_HANDLE.load(AtomicOrdering::Relaxed),
        Channel::Status => BLE_STATUS_HANDLE.load(AtomicOrdering::Relaxed),
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn ble_gap_event_handler(
    event: esp_idf_svc::sys::esp_gap_ble_cb_event_t,
    _param: *mut esp_idf_svc::sys::esp_ble_gap_cb_param_t,
) {
    use esp_idf_svc::sys::*;
    match event {
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_START_COMPLETE_EVT => {
            log::info!("BLE GAP: advertising started");
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_STOP_COMPLETE_EVT => {
            log::info!("BLE GAP: advertising stopped");
        }
        _ => {}
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn ble_gatts_event_handler(
    event: esp_idf_svc::sys::esp_gatts_cb_event_t,
    gatts_if: esp_idf_svc::sys::esp_gatt_if_t,
    param: *mut esp_idf_svc::sys::esp_ble_gatts_cb_param_t,
) {
    use esp_idf_svc::sys::*;

    BLE_GATTS_IF.store(gatts_if as u32, AtomicOrdering::Relaxed);

    match event {
        esp_gatts_cb_event_t_ESP_GATTS_REG_EVT => {
            log::info!("BLE GATTS: app registered (if={})", gatts_if);
            let mut svc_id = esp_gatt_srvc_id_t {
                id: esp_gatt_id_t {
                    uuid: uuid128_to_esp(SERVICE_UUID),
                    inst_id: 0,
                },
                is_primary: true,
            };
            unsafe {
                esp_ble_gatts_create_service(gatts_if, &mut svc_id, 10);
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_CREATE_EVT => {
            let svc_handle = unsafe { (*param).create.service_handle };
            BLE_SVC_HANDLE.store(svc_handle as u32, AtomicOrdering::Relaxed);
            log::info!("BLE GATTS: service created (handle={})", svc_handle);
            BLE_CHAR_STEP.store(1, AtomicOrdering::Relaxed);
            unsafe {
                esp_ble_gatts_start_service(svc_handle);
                add_gatt_char(
                    svc_handle,
                    CHAR_AUDIO,
                    ESP_GATT_PERM_READ,
                    ESP_GATT_CHAR_PROP_BIT_NOTIFY,
                );
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_EVT => {
            let handle = unsafe { (*param).add_char.attr_handle };
            let svc_handle = BLE_SVC_HANDLE.load(AtomicOrdering::Relaxed) as u16;
            match BLE_CHAR_STEP.load(AtomicOrdering::Relaxed) {
                1 => {
                    BLE_AUDIO_HANDLE.store(handle as u32, AtomicOrdering::Relaxed);
                    log::info!("BLE GATTS: audio char (handle={})", handle);
                    BLE_CHAR_STEP.store(2, AtomicOrdering::Relaxed);
                    unsafe {
                        add_gatt_char(
                            svc_handle,
                            CHAR_COMMAND,
                            ESP_GATT_PERM_READ,
                            ESP_GATT_CHAR_PROP_BIT_NOTIFY,
                        );
                    }
                }
                2 => {
                    BLE_COMMAND_HANDLE.store(handle as u32, AtomicOrdering::Relaxed);
                    log::info!("BLE GATTS: command char (handle={})", handle);
                    BLE_CHAR_STEP.store(3, AtomicOrdering::Relaxed);
                    unsafe {
                        add_gatt_char(
                            svc_handle,
                            CHAR_STATUS,
                            ESP_GATT_PERM_READ | ESP_GATT_PERM_WRITE,
                            ESP_GATT_CHAR_PROP_BIT_READ
                                | ESP_GATT_CHAR_PROP_BIT_WRITE
                                | ESP_GATT_CHAR_PROP_BIT_NOTIFY,
                        );
                    }
                }
                3 => {
                    BLE_STATUS_HANDLE.store(handle as u32, AtomicOrdering::Relaxed);
                    BLE_CHAR_STEP.store(4, AtomicOrdering::Relaxed);
                    log::info!("BLE GATTS: status char (handle={}), all registered", handle);
                }
                _ => {}
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_CONNECT_EVT => {
            let conn_id = unsafe { (*param).connect.conn_id };
            BLE_CONN_ID.store(conn_id as u32, AtomicOrdering::Relaxed);
            BLE_ATTACHED.store(true, AtomicOrdering::Relaxed);
            log::info!("BLE GATTS: central connected (conn_id={})", conn_id);
            push_pending(TransportEvent::PeerAttached);
        }
        esp_gatts_cb_event_t_ESP_GATTS_DISCONNECT_EVT => {
            BLE_ATTACHED.store(false, AtomicOrdering::Relaxed);
            BLE_CONN_ID.store(0, AtomicOrdering::Relaxed);
            log::info!("BLE GATTS: central disconnected");
            push_pending(TransportEvent::PeerDetached);
        }
        esp_gatts_cb_event_t_ESP_GATTS_WRITE_EVT => {
            let p = unsafe { &(*param).write };
            let handle = p.handle as u32;
            let data = unsafe { core::slice::from_raw_parts(p.value, p.len as usize) };
            let channel = [Channel::Status, Channel::Command, Channel::Audio]
                .into_iter()
                .find(|ch| channel_handle(*ch) == handle);
            if let Some(channel) = channel {
                push_pending(TransportEvent::BytesReceived {
                    channel,
                    bytes: data.to_vec(),
                });
            }
        }
        _ => {}
    }
}

// ───────────────────────────────────────────────────────────────
// Transport
// ───────────────────────────────────────────────────────────────

pub struct BleLinkTransport {
    device_name: heapless::String<24>,
    initialised: bool,
    advertising: bool,
    #[cfg(not(target_os = "espidf"))]
    attached: bool,
    #[cfg(not(target_os = "espidf"))]
    pending: heapless::Deque<TransportEvent, EVENT_QUEUE_CAP>,
    #[cfg(not(target_os = "espidf"))]
    sent: Vec<(Channel, Vec<u8>)>,
}

impl BleLinkTransport {
    pub fn new(device_name: heapless::String<24>) -> Self {
        Self {
            device_name,
            initialised: false,
            advertising: false,
            #[cfg(not(target_os = "espidf"))]
            attached: false,
            #[cfg(not(target_os = "espidf"))]
            pending: heapless::Deque::new(),
            #[cfg(not(target_os = "espidf"))]
            sent: Vec::new(),
        }
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn is_advertising(&self) -> bool {
        self.advertising
    }

    /// Bring up the radio and register the GATT service.  Advertising is
    /// left to the link state machine.
    pub fn init(&mut self) -> Result<(), BleTransportError> {
        if self.initialised {
            return Ok(());
        }
        self.platform_init()?;
        self.initialised = true;
        info!(
            "BLE: GATT service {:032x} ready as '{}'",
            SERVICE_UUID, self.device_name
        );
        Ok(())
    }

    fn check_payload(bytes: &[u8]) -> Result<(), BleTransportError> {
        if bytes.len() > MAX_NOTIFY_LEN {
            return Err(BleTransportError::PayloadTooLarge(bytes.len()));
        }
        Ok(())
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_init(&mut self) -> Result<(), BleTransportError> {
        use esp_idf_svc::sys::*;
        unsafe {
            // BLE-only mode releases the classic BT controller memory.
            esp_bt_controller_mem_release(esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT);

            let mut bt_cfg = esp_bt_controller_config_t::default();
            let steps: [(&str, i32); 4] = [
                ("bt_controller_init", esp_bt_controller_init(&mut bt_cfg)),
                (
                    "bt_controller_enable",
                    esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE),
                ),
                ("bluedroid_init", esp_bluedroid_init()),
                ("bluedroid_enable", esp_bluedroid_enable()),
            ];
            for (name, ret) in steps {
                if ret != ESP_OK as i32 {
                    log::error!("BLE: {} failed ({})", name, ret);
                    return Err(BleTransportError::StackInitFailed);
                }
            }

            esp_ble_gap_register_callback(Some(ble_gap_event_handler));
            esp_ble_gatts_register_callback(Some(ble_gatts_event_handler));
            esp_ble_gatts_app_register(0);

            let mut name = [0u8; 25];
            let bytes = self.device_name.as_bytes();
            name[..bytes.len()].copy_from_slice(bytes);
            esp_ble_gap_set_device_name(name.as_ptr() as *const _);
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_init(&mut self) -> Result<(), BleTransportError> {
        log::debug!("BLE(sim): radio initialised");
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_advertise(&mut self, start: bool) -> Result<(), BleTransportError> {
        use esp_idf_svc::sys::*;
        let ret = unsafe {
            if start {
                let mut adv_params = esp_ble_adv_params_t {
                    adv_int_min: 0x20,
                    adv_int_max: 0x40,
                    adv_type: esp_ble_adv_type_t_ADV_TYPE_IND,
                    own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
                    channel_map: esp_ble_adv_channel_t_ADV_CHNL_ALL,
                    adv_filter_policy: esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY,
                    ..core::mem::zeroed()
                };
                esp_ble_gap_start_advertising(&mut adv_params)
            } else {
                esp_ble_gap_stop_advertising()
            }
        };
        if ret != ESP_OK as i32 {
            return Err(BleTransportError::Stack(ret));
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_advertise(&mut self, start: bool) -> Result<(), BleTransportError> {
        log::debug!("BLE(sim): advertising={}", start);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_notify(&mut self, channel: Channel, bytes: &[u8]) -> Result<(), BleTransportError> {
        use esp_idf_svc::sys::*;
        let handle = channel_handle(channel);
        if handle == 0 {
            return Err(BleTransportError::ChannelMissing(channel));
        }
        let ret = unsafe {
            esp_ble_gatts_send_indicate(
                BLE_GATTS_IF.load(AtomicOrdering::Relaxed) as u8,
                BLE_CONN_ID.load(AtomicOrdering::Relaxed) as u16,
                handle as u16,
                bytes.len() as u16,
                bytes.as_ptr() as *mut u8,
                false,
            )
        };
        if ret != ESP_OK as i32 {
            return Err(BleTransportError::Stack(ret));
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_notify(&mut self, channel: Channel, bytes: &[u8]) -> Result<(), BleTransportError> {
        self.sent.push((channel, bytes.to_vec()));
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_disconnect(&mut self) -> Result<(), BleTransportError> {
        use esp_idf_svc::sys::*;
        let ret = unsafe {
            esp_ble_gatts_close(
                BLE_GATTS_IF.load(AtomicOrdering::Relaxed) as u8,
                BLE_CONN_ID.load(AtomicOrdering::Relaxed) as u16,
            )
        };
        if ret != ESP_OK as i32 {
            return Err(BleTransportError::Stack(ret));
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_disconnect(&mut self) -> Result<(), BleTransportError> {
        self.attached = false;
        self.push_sim(TransportEvent::PeerDetached);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_attached(&self) -> bool {
        BLE_ATTACHED.load(AtomicOrdering::Relaxed)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_attached(&self) -> bool {
        self.attached
    }

    #[cfg(target_os = "espidf")]
    fn platform_poll(&mut self) -> Option<TransportEvent> {
        BLE_PENDING.lock().ok().and_then(|mut q| q.pop_front())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_poll(&mut self) -> Option<TransportEvent> {
        self.pending.pop_front()
    }
}

// ── Simulation hooks ──────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
impl BleLinkTransport {
    fn push_sim(&mut self, event: TransportEvent) {
        if self.pending.push_back(event).is_err() {
            warn!("BLE(sim): event queue full, event dropped");
        }
    }

    /// A central connected.
    pub fn simulate_peer_attached(&mut self) {
        self.attached = true;
        self.push_sim(TransportEvent::PeerAttached);
    }

    /// The central went away (out of range, app closed).
    pub fn simulate_peer_detached(&mut self) {
        self.attached = false;
        self.push_sim(TransportEvent::PeerDetached);
    }

    /// The radio began pairing with a central.
    pub fn simulate_handshake(&mut self) {
        self.push_sim(TransportEvent::Handshake);
    }

    /// The central wrote `bytes` to the characteristic behind `channel`.
    pub fn simulate_write(&mut self, channel: Channel, bytes: &[u8]) {
        self.push_sim(TransportEvent::BytesReceived {
            channel,
            bytes: bytes.to_vec(),
        });
    }

    /// Every notification sent so far, oldest first.  Clears the record.
    pub fn take_sent(&mut self) -> Vec<(Channel, Vec<u8>)> {
        core::mem::take(&mut self.sent)
    }
}

// ───────────────────────────────────────────────────────────────
// LinkTransport implementation
// ───────────────────────────────────────────────────────────────

impl LinkTransport for BleLinkTransport {
    type Error = BleTransportError;

    fn send(&mut self, channel: Channel, bytes: &[u8]) -> Result<(), BleTransportError> {
        if !self.platform_attached() {
            return Err(BleTransportError::NotAttached);
        }
        if !self.has_channel(channel) {
            return Err(BleTransportError::ChannelMissing(channel));
        }
        Self::check_payload(bytes)?;
        self.platform_notify(channel, bytes).inspect_err(|e| {
            warn!("BLE: notify on {} failed: {}", channel.as_str(), e);
        })
    }

    #[cfg(target_os = "espidf")]
    fn has_channel(&self, channel: Channel) -> bool {
        self.initialised && channel_handle(channel) != 0
    }

    #[cfg(not(target_os = "espidf"))]
    fn has_channel(&self, _channel: Channel) -> bool {
        self.initialised
    }

    fn is_peer_attached(&self) -> bool {
        self.platform_attached()
    }

    fn start_advertising(&mut self) -> Result<(), BleTransportError> {
        if !self.initialised {
            return Err(BleTransportError::StackInitFailed);
        }
        if self.advertising {
            return Ok(());
        }
        self.platform_advertise(true)?;
        self.advertising = true;
        info!("BLE: advertising as '{}'", self.device_name);
        Ok(())
    }

    fn stop_advertising(&mut self) -> Result<(), BleTransportError> {
        if !self.advertising {
            return Ok(());
        }
        self.platform_advertise(false)?;
        self.advertising = false;
        info!("BLE: advertising stopped");
        Ok(())
    }

    fn disconnect_peer(&mut self) -> Result<(), BleTransportError> {
        if !self.platform_attached() {
            return Ok(());
        }
        info!("BLE: dropping central");
        self.platform_disconnect()
    }

    fn poll_event(&mut self) -> Option<TransportEvent> {
        self.platform_poll()
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
