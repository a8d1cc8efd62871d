//! Gateway relay transport.
//!
//! Devices without a direct broker connection talk to a gateway over a
//! byte link (UART, TCP).  Each publish/subscribe/deliver is a postcard
//! record inside a length-prefixed frame:
//!
//! ```text
//!  device ──[len][Publish{topic,payload}]──▶ gateway ──▶ broker
//!  device ◀─[len][Deliver{topic,payload}]── gateway ◀── broker
//! ```

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{InboundMessage, Transport};
use crate::error::{DecodeError, TransportError};
use crate::link::codec::{FrameDecoder, encode_frame};
use crate::link::transport::ByteLink;

/// Bytes pulled from the link per poll.
const READ_CHUNK: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelayKind {
    Subscribe,
    Publish,
    /// Gateway → device.
    Deliver,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayRecord {
    pub kind: RelayKind,
    pub topic: String,
    pub payload: Vec<u8>,
}

impl RelayRecord {
    /// Serialize and frame.
    pub fn to_frame(&self) -> Result<Vec<u8>, TransportError> {
        let body = postcard::to_allocvec(self).map_err(|_| TransportError::PublishFailed)?;
        encode_frame(&body).ok_or(TransportError::PublishFailed)
    }
}

/// Decode one frame payload into a record.
pub fn decode_record(frame: &[u8]) -> Result<RelayRecord, DecodeError> {
    postcard::from_bytes(frame).map_err(|_| DecodeError::Malformed)
}

/// [`Transport`] over any [`ByteLink`].
pub struct RelayTransport<L: ByteLink> {
    link: L,
    decoder: FrameDecoder,
    /// Link bytes read but not yet consumed by the decoder.
    pending: Vec<u8>,
}

impl<L: ByteLink> RelayTransport<L> {
    pub fn new(link: L) -> Self {
        Self {
            link,
            decoder: FrameDecoder::new(),
            pending: Vec::new(),
        }
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    fn send(&mut self, record: &RelayRecord) -> Result<(), TransportError> {
        let frame = record.to_frame()?;
        self.link.write_all(&frame)?;
        self.link.flush()
    }
}

impl<L: ByteLink> Transport for RelayTransport<L> {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
        self.send(&RelayRecord {
            kind: RelayKind::Publish,
            topic: topic.into(),
            payload: payload.to_vec(),
        })
    }

    fn subscribe(&mut self, filter: &str) -> Result<(), TransportError> {
        self.send(&RelayRecord {
            kind: RelayKind::Subscribe,
            topic: filter.into(),
            payload: Vec::new(),
        })
        .map_err(|_| TransportError::SubscribeFailed)
    }

    fn poll_inbound(&mut self) -> Result<Option<InboundMessage>, TransportError> {
        let mut buf = [0u8; READ_CHUNK];
        let n = self.link.read(&mut buf)?;
        self.pending.extend_from_slice(&buf[..n]);

        while !self.pending.is_empty() {
            let (used, frame) = self.decoder.feed(&self.pending);
            let record = frame.map(decode_record);
            self.pending.drain(..used);

            match record {
                None => break,
                Some(Ok(r)) if r.kind == RelayKind::Deliver => {
                    debug!("relay: deliver on {}", r.topic);
                    return Ok(Some(InboundMessage {
                        topic: r.topic,
                        payload: r.payload,
                    }));
                }
                Some(Ok(r)) => warn!("relay: unexpected {:?} from gateway", r.kind),
                Some(Err(e)) => warn!("relay: dropping frame: {}", e),
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::transport::MemoryLink;

    fn deliver(topic: &str, payload: &[u8]) -> Vec<u8> {
        RelayRecord {
            kind: RelayKind::Deliver,
            topic: topic.into(),
            payload: payload.to_vec(),
        }
        .to_frame()
        .unwrap()
    }

    #[test]
    fn publish_writes_one_frame() {
        let mut t = RelayTransport::new(MemoryLink::default());
        t.publish("a/b", b"{}").unwrap();

        let tx = &t.link().tx;
        let len = usize::from(u16::from_le_bytes([tx[0], tx[1]]));
        assert_eq!(tx.len(), 2 + len);
        let rec = decode_record(&tx[2..]).unwrap();
        assert_eq!(rec.kind, RelayKind::Publish);
        assert_eq!(rec.topic, "a/b");
        assert_eq!(rec.payload, b"{}");
    }

    #[test]
    fn one_delivery_per_poll() {
        let mut t = RelayTransport::new(MemoryLink::default());
        t.link_mut().rx.extend(deliver("t/1", b"one"));
        t.link_mut().rx.extend(deliver("t/2", b"two"));

        let first = t.poll_inbound().unwrap().unwrap();
        assert_eq!(first.topic, "t/1");
        let second = t.poll_inbound().unwrap().unwrap();
        assert_eq!(second.payload, b"two");
        assert!(t.poll_inbound().unwrap().is_none());
    }

    #[test]
    fn garbage_and_foreign_kinds_are_skipped() {
        let mut t = RelayTransport::new(MemoryLink::default());
        t.link_mut().rx.extend(encode_frame(&[0xFF; 3]).unwrap());
        let echo = RelayRecord {
            kind: RelayKind::Publish,
            topic: "x".into(),
            payload: vec![],
        };
        t.link_mut().rx.extend(echo.to_frame().unwrap());
        t.link_mut().rx.extend(deliver("ok", b"1"));

        assert_eq!(t.poll_inbound().unwrap().unwrap().topic, "ok");
    }
}
