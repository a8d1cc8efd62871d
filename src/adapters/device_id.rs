//! Device serial derived from the ESP32 factory MAC address.
//!
//! Produces a stable serial in the form `SIOT-XXYYZZ` (last 3 bytes of the
//! 6-byte MAC in uppercase hex).  Used when the configuration does not
//! carry an explicit serial number.

use core::fmt::Write;

/// Fixed-size serial string: "SIOT-XXYYZZ".
pub type SerialString = heapless::String<16>;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    // SAFETY: the buffer is exactly the 6 bytes the call writes.
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

pub fn serial_from_mac(mac: &MacAddress) -> SerialString {
    let mut id = SerialString::new();
    let _ = write!(id, "SIOT-{:02X}{:02X}{:02X}", mac[3], mac[4], mac[5]);
    id
}

/// Fill in the serial if the configuration left it empty.
pub fn ensure_serial(serial: &mut String) {
    if serial.trim().is_empty() {
        *serial = serial_from_mac(&read_mac()).as_str().into();
    }
}
