//! In-memory simulation adapters for host builds.
//!
//! [`SimBroker`] stands in for the pub/sub client and [`SimPlatform`] for
//! the HTTP fetch source, the flash slot and the restart hook.  Both record
//! everything so tests and the host demo can inspect what the session did.

use std::collections::{HashMap, VecDeque};

use log::info;

use crate::app::ports::{
    ContentLength, FetchPort, FlashPort, InboundMessage, SystemPort, Transport,
};
use crate::error::{TransportError, UpdateError};

// ───────────────────────────────────────────────────────────────
// Broker
// ───────────────────────────────────────────────────────────────

/// Loopback pub/sub transport.
#[derive(Default)]
pub struct SimBroker {
    pub published: Vec<(String, Vec<u8>)>,
    pub subscriptions: Vec<String>,
    inbox: VecDeque<InboundMessage>,
    /// While set, every publish/subscribe fails with `NotConnected`.
    pub offline: bool,
}

impl SimBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a message as if the cloud had sent it.
    pub fn inject(&mut self, topic: &str, payload: &[u8]) {
        self.inbox.push_back(InboundMessage {
            topic: topic.into(),
            payload: payload.to_vec(),
        });
    }

    pub fn pending(&self) -> usize {
        self.inbox.len()
    }

    /// Published messages whose topic starts with `prefix`, payloads as text.
    pub fn published_on(&self, prefix: &str) -> Vec<String> {
        self.published
            .iter()
            .filter(|(t, _)| t.starts_with(prefix))
            .map(|(_, p)| String::from_utf8_lossy(p).into_owned())
            .collect()
    }
}

impl Transport for SimBroker {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), TransportError> {
        if self.offline {
            return Err(TransportError::NotConnected);
        }
        self.published.push((topic.into(), payload.to_vec()));
        Ok(())
    }

    fn subscribe(&mut self, filter: &str) -> Result<(), TransportError> {
        if self.offline {
            return Err(TransportError::NotConnected);
        }
        self.subscriptions.push(filter.into());
        Ok(())
    }

    fn poll_inbound(&mut self) -> Result<Option<InboundMessage>, TransportError> {
        Ok(self.inbox.pop_front())
    }
}

// ───────────────────────────────────────────────────────────────
// Platform (fetch + flash + system)
// ───────────────────────────────────────────────────────────────

struct Served {
    bytes: Vec<u8>,
    announce_length: bool,
}

struct Stream {
    bytes: Vec<u8>,
    cursor: usize,
}

/// Simulated OTA platform.
#[derive(Default)]
pub struct SimPlatform {
    served: HashMap<String, Served>,
    stream: Option<Stream>,
    /// Per-read byte limits; once exhausted reads fill the whole buffer.
    read_plan: VecDeque<usize>,
    /// Close the stream cleanly after this many bytes (server hung up early).
    drop_after: Option<usize>,
    /// Fail the read after this many bytes (connection reset).
    fail_read_after: Option<usize>,

    /// Bytes written to the slot in the current attempt.
    pub flash: Vec<u8>,
    /// Last successfully committed image.
    pub committed: Option<Vec<u8>>,
    pub aborts: u32,
    pub fail_writes: bool,
    pub fail_commit: bool,

    pub delays: Vec<u32>,
    pub restarts: u32,
}

impl SimPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `bytes` at `url` with a Content-Length.
    pub fn serve(&mut self, url: &str, bytes: Vec<u8>) {
        self.served.insert(
            url.into(),
            Served {
                bytes,
                announce_length: true,
            },
        );
    }

    /// Serve `bytes` at `url` without announcing the length.
    pub fn serve_chunked(&mut self, url: &str, bytes: Vec<u8>) {
        self.served.insert(
            url.into(),
            Served {
                bytes,
                announce_length: false,
            },
        );
    }

    pub fn plan_reads(&mut self, sizes: &[usize]) {
        self.read_plan = sizes.iter().copied().collect();
    }

    pub fn drop_after(&mut self, bytes: usize) {
        self.drop_after = Some(bytes);
    }

    /// Deliver `bytes`, then return `FetchFailed` from the next read the
    /// way the HTTP client does when the connection resets.
    pub fn fail_read_after(&mut self, bytes: usize) {
        self.fail_read_after = Some(bytes);
    }
}

impl FetchPort for SimPlatform {
    fn open(&mut self, url: &str) -> Result<ContentLength, UpdateError> {
        let served = self.served.get(url).ok_or(UpdateError::FetchFailed)?;
        let total = if served.announce_length {
            let n = u32::try_from(served.bytes.len()).map_err(|_| UpdateError::InvalidSize)?;
            ContentLength::Known(n)
        } else {
            ContentLength::Unknown
        };
        self.stream = Some(Stream {
            bytes: served.bytes.clone(),
            cursor: 0,
        });
        Ok(total)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, UpdateError> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(0);
        };
        if self.fail_read_after.is_some_and(|cut| stream.cursor >= cut) {
            self.stream = None;
            return Err(UpdateError::FetchFailed);
        }

        let limit = self.read_plan.pop_front().unwrap_or(buf.len()).min(buf.len());
        let mut end = (stream.cursor + limit).min(stream.bytes.len());
        for cut in [self.drop_after, self.fail_read_after].into_iter().flatten() {
            end = end.min(cut.max(stream.cursor));
        }

        let n = end - stream.cursor;
        buf[..n].copy_from_slice(&stream.bytes[stream.cursor..end]);
        stream.cursor = end;
        let exhausted = end == stream.bytes.len();

        let dropped = self.drop_after.is_some_and(|cut| end >= cut);
        if exhausted || dropped {
            self.stream = None;
        }
        Ok(n)
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn close(&mut self) {
        self.stream = None;
    }
}

impl FlashPort for SimPlatform {
    fn begin_write(&mut self, _expected: ContentLength) -> Result<(), UpdateError> {
        self.flash.clear();
        Ok(())
    }

    fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), UpdateError> {
        if self.fail_writes {
            return Err(UpdateError::WriteFailed);
        }
        self.flash.extend_from_slice(chunk);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), UpdateError> {
        if self.fail_commit {
            return Err(UpdateError::VerifyFailed);
        }
        self.committed = Some(core::mem::take(&mut self.flash));
        Ok(())
    }

    fn abort(&mut self) {
        self.aborts += 1;
        self.flash.clear();
    }
}

impl SystemPort for SimPlatform {
    fn delay_ms(&mut self, ms: u32) {
        self.delays.push(ms);
    }

    fn restart(&mut self) {
        self.restarts += 1;
        info!("restart requested (simulation: no reset)");
    }
}
