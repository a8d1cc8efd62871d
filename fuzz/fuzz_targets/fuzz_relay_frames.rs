//! Fuzz target: relay link byte stream
//!
//! Feeds arbitrary bytes through the frame decoder and the postcard relay
//! record decoder, the path every byte from a gateway takes.  Asserts the
//! decoder never yields an empty or oversized frame and always makes
//! progress.
//!
//! cargo fuzz run fuzz_relay_frames

#![no_main]

use libfuzzer_sys::fuzz_target;
use simpleiot::adapters::relay::decode_record;
use simpleiot::link::{FrameDecoder, MAX_FRAME_SIZE};

fuzz_target!(|data: &[u8]| {
    let mut decoder = FrameDecoder::new();
    let mut rest = data;

    while !rest.is_empty() {
        let (used, frame) = decoder.feed(rest);
        assert!(used > 0, "decoder must consume input");
        if let Some(frame) = frame {
            assert!(!frame.is_empty() && frame.len() <= MAX_FRAME_SIZE);
            let _ = decode_record(frame);
        }
        rest = &rest[used..];
    }

    // After a reset the decoder must accept bytes cleanly again.
    decoder.reset();
    let _ = decoder.feed(data);
});
