//! Uplink selection.
//!
//! `IotConfig::with_gateway` picks the transport at boot: a direct broker
//! client, or the relay to a gateway over a byte link.  [`Uplink`] lets the
//! session hold either behind one concrete type.

use crate::app::ports::{InboundMessage, Transport};
use crate::error::TransportError;

pub enum Uplink<D: Transport, G: Transport> {
    /// Direct pub/sub client.
    Direct(D),
    /// Gateway relay.
    Gateway(G),
}

impl<D: Transport, G: Transport> Uplink<D, G> {
    pub fn is_gateway(&self) -> bool {
        matches!(self, Self::Gateway(_))
    }
}

impl<D: Transport, G: Transport> Transport for Uplink<D, G> {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
        match self {
            Self::Direct(t) => t.publish(topic, payload),
            Self::Gateway(t) => t.publish(topic, payload),
        }
    }

    fn subscribe(&mut self, filter: &str) -> Result<(), TransportError> {
        match self {
            Self::Direct(t) => t.subscribe(filter),
            Self::Gateway(t) => t.subscribe(filter),
        }
    }

    fn poll_inbound(&mut self) -> Result<Option<InboundMessage>, TransportError> {
        match self {
            Self::Direct(t) => t.poll_inbound(),
            Self::Gateway(t) => t.poll_inbound(),
        }
    }
}
