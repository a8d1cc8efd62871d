//! Gateway byte links and their framing.

pub mod codec;
pub mod transport;

pub use codec::{FrameDecoder, MAX_FRAME_SIZE, encode_frame};
pub use transport::{ByteLink, MemoryLink, NullLink};
