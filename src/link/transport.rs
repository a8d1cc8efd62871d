//! Byte link abstraction: any byte-oriented channel to a gateway.
//!
//! Concrete implementations:
//! - UART serial to a gateway co-processor
//! - TCP socket to a LAN gateway
//!
//! The relay transport is generic over `ByteLink`, so adding a new link
//! requires zero changes to the relay logic.

use crate::error::TransportError;

/// Byte-oriented link.
pub trait ByteLink {
    /// Read up to `buf.len()` bytes.  Returns 0 if no data is available
    /// (non-blocking).
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Write all of `data`.
    fn write_all(&mut self, data: &[u8]) -> Result<(), TransportError>;

    fn flush(&mut self) -> Result<(), TransportError>;
}

/// A link that discards all writes and never reads.
/// Useful when the device runs without a gateway attached.
pub struct NullLink;

impl ByteLink for NullLink {
    fn read(&mut self, _buf: &mut [u8]) -> Result<usize, TransportError> {
        Ok(0)
    }

    fn write_all(&mut self, _data: &[u8]) -> Result<(), TransportError> {
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// In-memory loopback pair for simulation and tests: bytes written on
/// one end are read on the other.
#[derive(Default)]
pub struct MemoryLink {
    pub rx: std::collections::VecDeque<u8>,
    pub tx: Vec<u8>,
}

impl ByteLink for MemoryLink {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let n = buf.len().min(self.rx.len());
        for (dst, src) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.tx.extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}
