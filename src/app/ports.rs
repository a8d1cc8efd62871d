//! Port traits: the hexagonal boundary between the device session and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ IotSession (core)
//! ```
//!
//! Driven adapters (pub/sub client, HTTP fetch, flash writer, restart hook)
//! implement these traits.  The [`IotSession`](super::service::IotSession)
//! consumes them via generics, so the core never touches the network or the
//! flash directly.  The application implements [`DeviceHandler`] to receive
//! inbound traffic.

use crate::error::{TransportError, UpdateError};
use crate::protocol::envelope::Envelope;
use crate::protocol::messages::{DataMessage, DiagnosticRequest, UpdateDescriptor};

// ───────────────────────────────────────────────────────────────
// Transport port (pub/sub client or gateway relay)
// ───────────────────────────────────────────────────────────────

/// A raw inbound delivery: topic plus undecoded payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Publish/subscribe capability.  The session depends on nothing else
/// about the transport.
pub trait Transport {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), TransportError>;

    fn subscribe(&mut self, filter: &str) -> Result<(), TransportError>;

    /// Hand over at most one buffered inbound message.  Returns `Ok(None)`
    /// when nothing is waiting; never blocks.
    fn poll_inbound(&mut self) -> Result<Option<InboundMessage>, TransportError>;
}

// ───────────────────────────────────────────────────────────────
// OTA ports (fetch source + flash-write primitive)
// ───────────────────────────────────────────────────────────────

/// Total size of an update image as reported by the fetch source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentLength {
    Known(u32),
    /// The source did not announce a length; bytes are accepted until
    /// end-of-stream.
    Unknown,
}

impl ContentLength {
    pub const fn known(self) -> Option<u32> {
        match self {
            Self::Known(n) => Some(n),
            Self::Unknown => None,
        }
    }
}

/// Streamed source of an update image (HTTP(S) on the device).
pub trait FetchPort {
    /// Open `url` and report the total length once.  The value is
    /// authoritative for the rest of the attempt.
    fn open(&mut self, url: &str) -> Result<ContentLength, UpdateError>;

    /// Read up to `buf.len()` bytes.  `Ok(0)` means nothing is available
    /// right now; end of data is signalled by [`FetchPort::is_open`]
    /// turning false.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, UpdateError>;

    /// Whether the stream can still deliver bytes.
    fn is_open(&self) -> bool;

    fn close(&mut self);
}

/// Incremental flash writer for a single image slot.
pub trait FlashPort {
    fn begin_write(&mut self, expected: ContentLength) -> Result<(), UpdateError>;

    fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), UpdateError>;

    /// Finalize and verify the written image.
    fn commit(&mut self) -> Result<(), UpdateError>;

    /// Discard whatever was written.  Must be safe to call in any state.
    fn abort(&mut self);
}

// ───────────────────────────────────────────────────────────────
// System port (delay + restart)
// ───────────────────────────────────────────────────────────────

pub trait SystemPort {
    fn delay_ms(&mut self, ms: u32);

    /// Reboot into the freshly committed image.  On real hardware this
    /// does not return.
    fn restart(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Application handler (exposed capability interface)
// ───────────────────────────────────────────────────────────────

/// Callbacks the application implements.  Every method has a no-op
/// default so applications only override what they care about.
pub trait DeviceHandler {
    /// Subscriptions are in place. `status` is 0 on success.
    fn on_ready(&mut self, _status: i32, _message: &str) {}

    fn on_data(&mut self, _message: &DataMessage) {}

    /// An update is offered.  The application decides whether to call
    /// [`IotSession::fetch`](super::service::IotSession::fetch).
    fn on_trigger_update(&mut self, _descriptor: &UpdateDescriptor) {}

    /// Returns an optional result intended for echo-back to the cloud.
    fn on_diagnostic(&mut self, _request: &DiagnosticRequest) -> Option<String> {
        None
    }

    /// Receives the diagnostic result for transmission by the application.
    fn on_diagnostic_result(&mut self, _request: &DiagnosticRequest, _result: &str) {}

    /// Admin request; `op` is the topic segment after the admin prefix.
    fn on_admin(&mut self, _op: &str, _envelope: &Envelope) {}

    /// Download progress.  Only fires when the percent changes.
    fn on_ota_progress(&mut self, _current: u32, _total: u32, _percent: u8) {}

    /// The current update attempt was abandoned.
    fn on_update_error(&mut self, _error: UpdateError) {}
}
