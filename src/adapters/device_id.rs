//! Wearable identity derived from the Bluetooth MAC address.
//!
//! The low three MAC bytes name the unit twice: `BIL-1B3C5D` prefixes every
//! outbound message id (`BIL-1B3C5D_17`) and `bil-wearable-1b3c5d` is the
//! advertised GAP name the phone app scans for.

use core::fmt::{self, Write};

use heapless::String;

pub type MacAddress = [u8; 6];

/// Message id prefix, `BIL-` plus six uppercase hex digits.
pub type IdPrefix = String<16>;

/// GAP local name, `bil-wearable-` plus six lowercase hex digits.
pub type BleName = String<24>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    mac: MacAddress,
    id: IdPrefix,
    ble_name: BleName,
}

impl DeviceIdentity {
    /// Read the radio MAC and derive the identity from it.
    pub fn detect() -> Self {
        Self::from_mac(platform_bt_mac())
    }

    pub fn from_mac(mac: MacAddress) -> Self {
        let [.., a, b, c] = mac;
        let mut id = IdPrefix::new();
        let _ = write!(id, "BIL-{a:02X}{b:02X}{c:02X}");
        let mut ble_name = BleName::new();
        let _ = write!(ble_name, "bil-wearable-{a:02x}{b:02x}{c:02x}");
        Self { mac, id, ble_name }
    }

    pub fn mac(&self) -> MacAddress {
        self.mac
    }

    /// Prefix handed to the messenger's id generator.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn ble_name(&self) -> BleName {
        self.ble_name.clone()
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.mac;
        write!(
            f,
            "{} ({}, {:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x})",
            self.id, self.ble_name, m[0], m[1], m[2], m[3], m[4], m[5]
        )
    }
}

// ── Platform ───────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn platform_bt_mac() -> MacAddress {
    use esp_idf_svc::sys;

    let mut mac: MacAddress = [0u8; 6];
    let err = unsafe { sys::esp_read_mac(mac.as_mut_ptr(), sys::esp_mac_type_t_ESP_MAC_BT) };
    if err != sys::ESP_OK {
        log::warn!("ID | esp_read_mac(BT) failed ({err}), using base MAC");
        unsafe {
            sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
        }
    }
    mac
}

#[cfg(not(target_os = "espidf"))]
fn platform_bt_mac() -> MacAddress {
    [0x24, 0x6F, 0x28, 0x1B, 0x3C, 0x5D]
}
