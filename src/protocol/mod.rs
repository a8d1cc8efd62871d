//! Message protocol layer: identity, topics, envelopes and inbound routing.
//!
//! ```text
//!  set(name, value) ──▶ envelope::encode_set ──▶ topic::build_topic ──▶ Transport
//!
//!  Transport ──▶ Envelope::decode ──▶ dispatch::route ──▶ handler / UpdateController
//! ```
//!
//! Everything in here is a pure transform; all I/O belongs to the session
//! and the adapters.

pub mod dispatch;
pub mod envelope;
pub mod identity;
pub mod messages;
pub mod topic;

pub use dispatch::{Inbound, route};
pub use envelope::{Envelope, GeoPoint, SetValue};
pub use identity::DeviceIdentity;
pub use messages::{DataMessage, DiagType, DiagnosticRequest, UpdateDescriptor, UpdateType, ValueType};
pub use topic::{InboundClass, MessageClass, Topic, classify};
