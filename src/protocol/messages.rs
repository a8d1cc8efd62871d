//! Typed views of inbound envelopes handed to application handlers.

use super::envelope::Envelope;

/// Type hint for a data value, derived from the optional `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueType {
    Int,
    Float,
    Double,
    #[default]
    Str,
    Boolean,
}

impl ValueType {
    /// Map a hint to a type.  Absent or unrecognised hints fall back to
    /// [`ValueType::Str`].
    pub fn from_hint(hint: Option<&str>) -> Self {
        let Some(hint) = hint.map(str::trim) else {
            return Self::Str;
        };
        match hint.to_ascii_lowercase().as_str() {
            "integer" | "int" => Self::Int,
            "float" => Self::Float,
            "double" => Self::Double,
            "boolean" | "bool" => Self::Boolean,
            _ => Self::Str,
        }
    }
}

/// Kind of payload an update trigger delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateType {
    #[default]
    Firmware,
    Config,
    File,
    Test,
}

impl UpdateType {
    pub fn from_hint(hint: Option<&str>) -> Self {
        match hint.map(str::to_ascii_lowercase).as_deref() {
            Some("config") => Self::Config,
            Some("file") => Self::File,
            Some("test") => Self::Test,
            _ => Self::Firmware,
        }
    }
}

/// Diagnostic request kind; wire value is the integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DiagType {
    Heartbeat = 0,
    RunDiag = 1,
    BatteryLevel = 2,
    Restart = 3,
    Shutdown = 4,
    Reset = 5,
    FactoryReset = 6,
    ResetKey = 7,
    SaveState = 8,
    ClearState = 9,
    ReturnState = 10,
    Custom = 11,
}

impl DiagType {
    pub fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            0 => Self::Heartbeat,
            1 => Self::RunDiag,
            2 => Self::BatteryLevel,
            3 => Self::Restart,
            4 => Self::Shutdown,
            5 => Self::Reset,
            6 => Self::FactoryReset,
            7 => Self::ResetKey,
            8 => Self::SaveState,
            9 => Self::ClearState,
            10 => Self::ReturnState,
            11 => Self::Custom,
            _ => return None,
        })
    }

    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// A cloud-side value change for the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataMessage {
    pub name: Option<String>,
    pub value: Option<String>,
    pub value_type: ValueType,
}

impl DataMessage {
    pub fn from_envelope(env: &Envelope) -> Self {
        Self {
            name: env.name(),
            value: env.value(),
            value_type: ValueType::from_hint(env.text("type").as_deref()),
        }
    }
}

/// Decoded update trigger: `{device, version, url, md5?, force?, type?}`.
///
/// Lives only for the current update attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateDescriptor {
    /// Serial the trigger is addressed to, if any.
    pub device: Option<String>,
    pub target_version: Option<String>,
    pub download_url: Option<String>,
    pub content_md5: Option<String>,
    /// Defaults to `true` when the field is absent.
    pub force: bool,
    pub update_type: UpdateType,
}

impl UpdateDescriptor {
    pub fn from_envelope(env: &Envelope) -> Self {
        Self {
            device: env.text("device"),
            target_version: env.text("version"),
            download_url: env.text("url"),
            content_md5: env.text("md5"),
            force: env.flag("force").unwrap_or(true),
            update_type: UpdateType::from_hint(env.text("type").as_deref()),
        }
    }

    /// `false` only when the trigger names a different device.
    pub fn is_addressed_to(&self, serial: &str) -> bool {
        self.device.as_deref().is_none_or(|d| d == serial)
    }
}

/// Decoded diagnostic request: `{id, data, type}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticRequest {
    pub id: Option<String>,
    pub data: Option<String>,
    pub diag_type: Option<DiagType>,
}

impl DiagnosticRequest {
    pub fn from_envelope(env: &Envelope) -> Self {
        Self {
            id: env.text("id"),
            data: env.text("data"),
            diag_type: env.integer("type").and_then(DiagType::from_code),
        }
    }
}
