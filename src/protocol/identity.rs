//! Device identity: the immutable `{project, model, serial, firmware}` tuple
//! every topic and outbound envelope is derived from.

use core::fmt::Write;

use crate::error::ConfigError;

/// Maximum characters of any identity field embedded in a topic or client id.
pub const MAX_SEGMENT_CHARS: usize = 25;

/// Client id buffer: `<model>-<serial>`, each side truncated.
pub type ClientId = heapless::String<{ 2 * MAX_SEGMENT_CHARS * 4 + 1 }>;

/// Immutable device identity.  Constructed once at configuration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    project: String,
    model: String,
    serial: String,
    firmware_version: String,
}

impl DeviceIdentity {
    /// Validate and build an identity.  Empty (or all-whitespace) fields are
    /// rejected with [`ConfigError::InvalidIdentity`] naming the field.
    pub fn new(
        project: &str,
        model: &str,
        serial: &str,
        firmware_version: &str,
    ) -> Result<Self, ConfigError> {
        for (field, value) in [
            ("project", project),
            ("model", model),
            ("serial", serial),
            ("firmware_version", firmware_version),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidIdentity(field));
            }
        }

        Ok(Self {
            project: project.to_owned(),
            model: model.to_owned(),
            serial: serial.to_owned(),
            firmware_version: firmware_version.to_owned(),
        })
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn firmware_version(&self) -> &str {
        &self.firmware_version
    }

    /// MQTT client id / thing name: `<model>-<serial>`.
    pub fn client_id(&self) -> ClientId {
        let mut id = ClientId::new();
        // Capacity covers two full segments of 4-byte chars plus the dash.
        let _ = write!(
            id,
            "{}-{}",
            truncate_segment(&self.model),
            truncate_segment(&self.serial)
        );
        id
    }
}

/// Cut a field to [`MAX_SEGMENT_CHARS`] characters on a char boundary.
pub fn truncate_segment(s: &str) -> &str {
    match s.char_indices().nth(MAX_SEGMENT_CHARS) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
