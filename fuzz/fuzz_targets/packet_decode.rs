//! Fuzz target for Packet::decode and HandshakeEnvelope::decode
//!
//! The decoder should NEVER panic. All invalid inputs should return an error,
//! and anything that decodes must re-encode to the same bytes.

#![no_main]

use lanyard_proto::{HandshakeEnvelope, Packet};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(packet) = Packet::decode(data) {
        let encoded = packet.to_vec().expect("decoded packet re-encodes");
        assert_eq!(encoded, data, "decode/encode must be lossless");

        if let Ok(envelope) = HandshakeEnvelope::decode(&packet.body) {
            let _ = envelope.handshake();
        }
    }
});
