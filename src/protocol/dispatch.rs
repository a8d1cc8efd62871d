//! Inbound routing: topic + envelope to a typed dispatch target.
//!
//! Pure function of its inputs: no state is carried between calls.  The
//! session applies the result to the registered handler and the update
//! controller.

use super::envelope::Envelope;
use super::messages::{DataMessage, DiagnosticRequest, UpdateDescriptor};
use super::topic::{ADM_DIAG_PREFIX, ADM_PREFIX, DIAG_PREFIX, InboundClass, classify, op_after};

/// A routed inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Update offered by the cloud; the application decides whether to fetch.
    UpdateTrigger(UpdateDescriptor),
    /// Admin request; `op` is the topic segment after `simpleiot_v1/adm`.
    Admin { op: String, envelope: Envelope },
    /// Diagnostic request; `op` is the segment after the diag prefix.
    Diagnostic { op: String, request: DiagnosticRequest },
    /// Application data (also the fallback for unknown topics).
    Data(DataMessage),
}

impl Inbound {
    pub fn class(&self) -> InboundClass {
        match self {
            Self::UpdateTrigger(_) => InboundClass::UpdateTrigger,
            Self::Admin { .. } => InboundClass::Admin,
            Self::Diagnostic { .. } => InboundClass::Diagnostic,
            Self::Data(_) => InboundClass::Application,
        }
    }
}

/// Route an already-decoded envelope.
pub fn route(topic: &str, envelope: Envelope) -> Inbound {
    match classify(topic) {
        InboundClass::UpdateTrigger => {
            Inbound::UpdateTrigger(UpdateDescriptor::from_envelope(&envelope))
        }
        InboundClass::Admin => Inbound::Admin {
            op: op_after(topic, ADM_PREFIX).to_owned(),
            envelope,
        },
        InboundClass::Diagnostic => {
            let prefix = if topic.starts_with(ADM_DIAG_PREFIX) {
                ADM_DIAG_PREFIX
            } else {
                DIAG_PREFIX
            };
            Inbound::Diagnostic {
                op: op_after(topic, prefix).to_owned(),
                request: DiagnosticRequest::from_envelope(&envelope),
            }
        }
        InboundClass::Application => Inbound::Data(DataMessage::from_envelope(&envelope)),
    }
}
