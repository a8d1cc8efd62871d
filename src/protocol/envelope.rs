//! Envelope codec: JSON payloads carried by every protocol message.
//!
//! Outbound `set` envelope (field order is part of the wire format):
//!
//! ```text
//! {"action":"set","project":"Sunshine","serial":"TIE-DEMO01",
//!  "name":"oil_pressure","value":"20","geo_lat":"12.2000","geo_lng":"-123.4000"}
//! ```
//!
//! `value` is always a string.  Typed values are formatted into a canonical
//! string before encoding; receivers re-derive the type from an optional
//! `type` hint.  Pure transforms only, no I/O.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{DecodeError, ProtocolError};

use super::identity::DeviceIdentity;

/// Maximum serialized envelope size in bytes.
pub const MAX_PAYLOAD_SIZE: usize = 1024;

/// Significant digits used for floating-point values.
const FLOAT_SIGNIFICANT_DIGITS: i32 = 6;

// ───────────────────────────────────────────────────────────────
// Typed values
// ───────────────────────────────────────────────────────────────

/// A value handed to `set`.  Type-erased to a string on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum SetValue {
    Text(String),
    Int(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
}

impl SetValue {
    /// Canonical wire representation.
    pub fn to_wire(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Int(v) => v.to_string(),
            Self::Float(v) => format_general(f64::from(*v)),
            Self::Double(v) => format_general(*v),
            Self::Bool(v) => if *v { "true" } else { "false" }.to_owned(),
        }
    }
}

impl From<&str> for SetValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for SetValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<i32> for SetValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for SetValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for SetValue {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f32> for SetValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<f64> for SetValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<bool> for SetValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// printf `%g`-style formatting with six significant digits.
pub fn format_general(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_owned();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_owned();
    }
    if v == 0.0 {
        return if v.is_sign_negative() { "-0" } else { "0" }.to_owned();
    }

    let sci = format!("{:.*e}", (FLOAT_SIGNIFICANT_DIGITS - 1) as usize, v);
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);

    if exp < -4 || exp >= FLOAT_SIGNIFICANT_DIGITS {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exp.abs())
    } else {
        let decimals = (FLOAT_SIGNIFICANT_DIGITS - 1 - exp) as usize;
        trim_fraction(&format!("{v:.decimals$}")).to_owned()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Optional location attached to a `set`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f32,
    pub lng: f32,
}

// ───────────────────────────────────────────────────────────────
// Outbound encoding
// ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct SetEnvelope<'a> {
    action: &'static str,
    project: &'a str,
    serial: &'a str,
    name: &'a str,
    value: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    geo_lat: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    geo_lng: Option<String>,
}

#[derive(Serialize)]
struct UpdateControlEnvelope<'a> {
    project: &'a str,
    serial: &'a str,
    version: &'a str,
    op: &'a str,
    #[serde(skip_serializing_if = "core::ops::Not::not")]
    force: bool,
}

/// Encode a `set` envelope.  Always `action = "set"`.
pub fn encode_set(
    identity: &DeviceIdentity,
    name: &str,
    value: &SetValue,
    geo: Option<GeoPoint>,
) -> Result<Vec<u8>, ProtocolError> {
    let wire = value.to_wire();
    let envelope = SetEnvelope {
        action: "set",
        project: identity.project(),
        serial: identity.serial(),
        name,
        value: &wire,
        geo_lat: geo.map(|g| format!("{:.4}", g.lat)),
        geo_lng: geo.map(|g| format!("{:.4}", g.lng)),
    };
    to_bounded_json(&envelope)
}

/// Encode an update-control envelope (`check`, `received`, `installed`).
/// `force` is only emitted when set.
pub fn encode_update_control(
    identity: &DeviceIdentity,
    op: &str,
    force: bool,
) -> Result<Vec<u8>, ProtocolError> {
    to_bounded_json(&UpdateControlEnvelope {
        project: identity.project(),
        serial: identity.serial(),
        version: identity.firmware_version(),
        op,
        force,
    })
}

fn to_bounded_json<T: Serialize>(envelope: &T) -> Result<Vec<u8>, ProtocolError> {
    let bytes = serde_json::to_vec(envelope).map_err(|_| ProtocolError::Serialize)?;
    if bytes.len() > MAX_PAYLOAD_SIZE {
        return Err(ProtocolError::PayloadTooLarge);
    }
    Ok(bytes)
}

// ───────────────────────────────────────────────────────────────
// Inbound decoding
// ───────────────────────────────────────────────────────────────

/// A decoded inbound envelope.
///
/// Fields are kept as received; accessors return `None` for anything
/// missing or of an unusable shape.  Nothing is defaulted here.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Envelope {
    fields: Map<String, Value>,
}

impl Envelope {
    /// Parse raw bytes.  Trailing NULs and whitespace (C-string transports)
    /// are ignored; anything that is not a JSON object is `Malformed`.
    pub fn decode(raw: &[u8]) -> Result<Self, DecodeError> {
        let end = raw
            .iter()
            .rposition(|b| *b != 0 && !b.is_ascii_whitespace())
            .map_or(0, |i| i + 1);
        match serde_json::from_slice::<Value>(&raw[..end]) {
            Ok(Value::Object(fields)) => Ok(Self { fields }),
            _ => Err(DecodeError::Malformed),
        }
    }

    /// String view of a field.  Numbers and booleans are rendered as text;
    /// null, arrays and objects count as absent.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.fields.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Boolean view: JSON bools, `"true"`/`"false"`, or numbers (non-zero).
    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.fields.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
            Value::Number(n) => n.as_f64().map(|v| v != 0.0),
            _ => None,
        }
    }

    /// Integer view: JSON integers or numeric strings.
    pub fn integer(&self, key: &str) -> Option<i64> {
        match self.fields.get(key)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn action(&self) -> Option<String> {
        self.text("action")
    }

    pub fn name(&self) -> Option<String> {
        self.text("name")
    }

    pub fn value(&self) -> Option<String> {
        self.text("value")
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
