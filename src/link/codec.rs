//! Length-prefix frame codec for gateway relay links.
//!
//! Wire format:
//! ```text
//! ┌────────────┬────────────────────────────┐
//! │ Length (2B)│ postcard relay record (N B)│
//! │ LE u16     │                            │
//! └────────────┴────────────────────────────┘
//! ```
//!
//! Byte links deliver arbitrary slices: part of a header, part of a
//! record, or several records back to back.  The decoder accumulates and
//! reports how much of each slice it consumed so the caller can resume
//! after a completed frame.

/// Largest record: topic buffer + max envelope + postcard overhead.
pub const MAX_FRAME_SIZE: usize = 1536;

const HEADER_SIZE: usize = 2;

enum DecoderState {
    ReadingHeader { collected: usize },
    ReadingPayload { expected: usize, collected: usize },
}

/// Streaming frame decoder.
pub struct FrameDecoder {
    state: DecoderState,
    header: [u8; HEADER_SIZE],
    payload: Box<[u8; MAX_FRAME_SIZE]>,
    /// Frames dropped for an out-of-range length.
    rejected: u32,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            state: DecoderState::ReadingHeader { collected: 0 },
            header: [0; HEADER_SIZE],
            payload: Box::new([0; MAX_FRAME_SIZE]),
            rejected: 0,
        }
    }

    /// Feed bytes into the decoder.
    ///
    /// Returns the number of bytes consumed from `data` and, when a frame
    /// completed, its payload.  Bytes past a completed frame are left
    /// unconsumed; feed them again.  The payload slice is valid until the
    /// next call.
    pub fn feed(&mut self, data: &[u8]) -> (usize, Option<&[u8]>) {
        let mut offset = 0;

        while offset < data.len() {
            match &mut self.state {
                DecoderState::ReadingHeader { collected } => {
                    let to_copy = (HEADER_SIZE - *collected).min(data.len() - offset);
                    self.header[*collected..*collected + to_copy]
                        .copy_from_slice(&data[offset..offset + to_copy]);
                    *collected += to_copy;
                    offset += to_copy;

                    if *collected == HEADER_SIZE {
                        let expected = usize::from(u16::from_le_bytes(self.header));
                        if expected == 0 || expected > MAX_FRAME_SIZE {
                            log::warn!("relay: dropping frame header (len {})", expected);
                            self.rejected = self.rejected.saturating_add(1);
                            self.state = DecoderState::ReadingHeader { collected: 0 };
                            continue;
                        }
                        self.state = DecoderState::ReadingPayload {
                            expected,
                            collected: 0,
                        };
                    }
                }

                DecoderState::ReadingPayload { expected, collected } => {
                    let to_copy = (*expected - *collected).min(data.len() - offset);
                    self.payload[*collected..*collected + to_copy]
                        .copy_from_slice(&data[offset..offset + to_copy]);
                    *collected += to_copy;
                    offset += to_copy;

                    if *collected == *expected {
                        let len = *expected;
                        self.state = DecoderState::ReadingHeader { collected: 0 };
                        return (offset, Some(&self.payload[..len]));
                    }
                }
            }
        }

        (offset, None)
    }

    pub fn rejected(&self) -> u32 {
        self.rejected
    }

    /// Reset decoder state (e.g. after the link reconnects).
    pub fn reset(&mut self) {
        self.state = DecoderState::ReadingHeader { collected: 0 };
    }
}

/// Prefix `payload` with its length.  `None` if it exceeds [`MAX_FRAME_SIZE`].
pub fn encode_frame(payload: &[u8]) -> Option<Vec<u8>> {
    if payload.is_empty() || payload.len() > MAX_FRAME_SIZE {
        return None;
    }
    let len = u16::try_from(payload.len()).ok()?;
    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(payload);
    Some(frame)
}
