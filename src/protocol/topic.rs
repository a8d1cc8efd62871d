//! Topic construction and inbound classification.
//!
//! Outbound topics are always built, never parsed:
//!
//! ```text
//! simpleiot_v1/<class>/<op>/<project>/<model>/<serial>
//!              app | adm | sys
//! ```
//!
//! Inbound topics are classified by namespace prefix in a fixed priority
//! order: update trigger, admin (with a diagnostic sub-namespace), system
//! diagnostic, and finally application data.  Anything unmatched is treated
//! as application data and is never rejected.

use core::fmt::Write;

use crate::error::ProtocolError;

use super::identity::{DeviceIdentity, truncate_segment};

pub const TOPIC_ROOT: &str = "simpleiot_v1";
pub const APP_PREFIX: &str = "simpleiot_v1/app";
pub const MONITOR_PREFIX: &str = "simpleiot_v1/app/monitor";
pub const ADM_PREFIX: &str = "simpleiot_v1/adm";
pub const UPDATE_PREFIX: &str = "simpleiot_v1/adm/update";
pub const ADM_DIAG_PREFIX: &str = "simpleiot_v1/adm/diag";
pub const SYS_PREFIX: &str = "simpleiot_v1/sys";
pub const DIAG_PREFIX: &str = "simpleiot_v1/sys/diag";

/// Operation for application telemetry sets.
pub const OP_SET_DATA: &str = "data/set";

/// Topic buffer capacity in bytes.
pub const MAX_TOPIC_LEN: usize = 256;

/// Fixed-capacity topic string.
pub type Topic = heapless::String<MAX_TOPIC_LEN>;

// ───────────────────────────────────────────────────────────────
// Message class (outbound namespace)
// ───────────────────────────────────────────────────────────────

/// Top-level message namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageClass {
    /// Values of the application itself.
    Application,
    /// Provisioning, update control and device management.
    Admin,
    /// Device-level data: heartbeat, battery, diagnostics.
    System,
}

impl MessageClass {
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Application => APP_PREFIX,
            Self::Admin => ADM_PREFIX,
            Self::System => SYS_PREFIX,
        }
    }
}

/// Build `<prefix>/<op>/<project>/<model>/<serial>`.
///
/// Identity fields are truncated to 25 characters each.  Fails only if the
/// result does not fit the topic buffer.
pub fn build_topic(
    class: MessageClass,
    op: &str,
    identity: &DeviceIdentity,
) -> Result<Topic, ProtocolError> {
    let mut topic = Topic::new();
    write!(
        topic,
        "{}/{}/{}/{}/{}",
        class.prefix(),
        op,
        truncate_segment(identity.project()),
        truncate_segment(identity.model()),
        truncate_segment(identity.serial())
    )
    .map_err(|_| ProtocolError::TopicTooLong)?;
    Ok(topic)
}

/// System diagnostic topic: `simpleiot_v1/sys/diag/<op>/<project>/<model>/<serial>`.
pub fn diag_topic(op: &str, identity: &DeviceIdentity) -> Result<Topic, ProtocolError> {
    let mut full_op: heapless::String<MAX_TOPIC_LEN> = heapless::String::new();
    write!(full_op, "diag/{op}").map_err(|_| ProtocolError::TopicTooLong)?;
    build_topic(MessageClass::System, &full_op, identity)
}

/// Inbound subscription for cloud-side value changes:
/// `simpleiot_v1/app/monitor/<project>/<model>/<serial>/#`.
pub fn monitor_topic(identity: &DeviceIdentity) -> Result<Topic, ProtocolError> {
    suffixed(MONITOR_PREFIX, identity, "/#")
}

/// Inbound subscription for update triggers:
/// `simpleiot_v1/adm/update/<project>/<model>/<serial>`.
pub fn update_topic(identity: &DeviceIdentity) -> Result<Topic, ProtocolError> {
    suffixed(UPDATE_PREFIX, identity, "")
}

/// Inbound subscription for diagnostic requests, any operation:
/// `simpleiot_v1/sys/diag/+/<project>/<model>/<serial>`.
pub fn diag_subscription(identity: &DeviceIdentity) -> Result<Topic, ProtocolError> {
    build_topic(MessageClass::System, "diag/+", identity)
}

fn suffixed(prefix: &str, identity: &DeviceIdentity, suffix: &str) -> Result<Topic, ProtocolError> {
    let mut topic = Topic::new();
    write!(
        topic,
        "{}/{}/{}/{}{}",
        prefix,
        truncate_segment(identity.project()),
        truncate_segment(identity.model()),
        truncate_segment(identity.serial()),
        suffix
    )
    .map_err(|_| ProtocolError::TopicTooLong)?;
    Ok(topic)
}

// ───────────────────────────────────────────────────────────────
// Inbound classification
// ───────────────────────────────────────────────────────────────

/// Dispatch target of an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InboundClass {
    UpdateTrigger,
    Admin,
    Diagnostic,
    Application,
}

impl InboundClass {
    /// Namespace the inbound class lives in.
    pub const fn message_class(self) -> MessageClass {
        match self {
            Self::UpdateTrigger | Self::Admin => MessageClass::Admin,
            Self::Diagnostic => MessageClass::System,
            Self::Application => MessageClass::Application,
        }
    }
}

/// Classify an inbound topic.  First match wins; never fails.
pub fn classify(topic: &str) -> InboundClass {
    if in_namespace(topic, UPDATE_PREFIX) {
        InboundClass::UpdateTrigger
    } else if in_namespace(topic, ADM_PREFIX) {
        if in_namespace(topic, ADM_DIAG_PREFIX) {
            InboundClass::Diagnostic
        } else {
            InboundClass::Admin
        }
    } else if in_namespace(topic, DIAG_PREFIX) {
        InboundClass::Diagnostic
    } else {
        InboundClass::Application
    }
}

/// Operation segment following `prefix` (e.g. `check` in
/// `simpleiot_v1/adm/check/...`).  Empty when the topic has none.
pub fn op_after<'a>(topic: &'a str, prefix: &str) -> &'a str {
    topic
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('/'))
        .and_then(|rest| rest.split('/').next())
        .unwrap_or("")
}

/// `prefix` matches on a whole-segment boundary.
fn in_namespace(topic: &str, prefix: &str) -> bool {
    match topic.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
