//! Fuzz target: inbound envelope decode + routing
//!
//! Splits the input into a topic and a payload and pushes both through
//! `Envelope::decode` and `route`.  Neither may panic, and routing must
//! agree with `classify` on the dispatch target.
//!
//! cargo fuzz run fuzz_envelope_decode

#![no_main]

use libfuzzer_sys::fuzz_target;
use simpleiot::protocol::dispatch::route;
use simpleiot::protocol::envelope::Envelope;
use simpleiot::protocol::topic::classify;

fuzz_target!(|data: &[u8]| {
    let split = data.iter().position(|b| *b == 0).unwrap_or(data.len());
    let topic = String::from_utf8_lossy(&data[..split]);
    let payload = data.get(split + 1..).unwrap_or(&[]);

    let class = classify(&topic);
    if let Ok(envelope) = Envelope::decode(payload) {
        let inbound = route(&topic, envelope);
        assert_eq!(inbound.class(), class, "routing must agree with classify");
    }
});
