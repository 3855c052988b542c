//! Fuzz target for the key-evolution ratchet
//!
//! # Strategy
//!
//! - Random forward jumps, including generation boundaries and large gaps
//! - Backward jumps into already-evolved generations
//! - Delivery of every produced packet to a paired decoder, optionally
//!   tampered
//!
//! # Invariants
//!
//! - Generation never decreases on either side
//! - `generation == last_sequence / packets_per_evolution`
//! - Untampered packets at a reachable sequence always decode to the input
//! - Tampered packets never decode and leave the decoder unchanged

#![no_main]

use arbitrary::Arbitrary;
use lanyard_crypto::{
    Direction, StreamCipher, StreamKey, MAX_PACKETS_PER_EVOLUTION, MIN_PACKETS_PER_EVOLUTION,
    NONCE_RANDOM_SIZE,
};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Clone, Arbitrary)]
struct RatchetScenario {
    key: [u8; 64],
    packets_per_evolution: u16,
    operations: Vec<Operation>,
}

#[derive(Debug, Clone, Arbitrary)]
enum Operation {
    /// Encode at last_sequence + step and deliver
    Forward { step: u16, message: Vec<u8>, suffix: [u8; NONCE_RANDOM_SIZE] },
    /// Encode at a sequence below the current one
    Backward { step: u16 },
    /// Encode and deliver with one flipped ciphertext bit
    Tampered { message: Vec<u8>, bit: u16 },
}

fuzz_target!(|scenario: RatchetScenario| {
    let range = MIN_PACKETS_PER_EVOLUTION..=MAX_PACKETS_PER_EVOLUTION;
    let ppe = u32::from(scenario.packets_per_evolution).clamp(*range.start(), *range.end());
    let Ok(key) = StreamKey::generate(&scenario.key, ppe) else {
        return;
    };

    let mut tx = StreamCipher::new(key.clone(), Direction::Encode);
    let mut rx = StreamCipher::new(key, Direction::Decode);

    for operation in scenario.operations.into_iter().take(64) {
        let generation = (tx.generation(), rx.generation());

        match operation {
            Operation::Forward { step, message, suffix } => {
                let sequence = tx.last_sequence() + u64::from(step.max(1));
                let Ok(encoded) = tx.encode(&message, b"aad", sequence, suffix) else {
                    continue;
                };
                let decoded = rx.decode(&encoded, b"aad", sequence).expect("reachable decode");
                assert_eq!(decoded, message);
            },
            Operation::Backward { step } => {
                let sequence = tx.last_sequence().saturating_sub(u64::from(step));
                let result = tx.encode(b"x", b"", sequence, [0; NONCE_RANDOM_SIZE]);
                if sequence / u64::from(ppe) < tx.generation() {
                    assert!(result.is_err());
                }
            },
            Operation::Tampered { message, bit } => {
                let sequence = tx.last_sequence() + 1;
                let mut encoded =
                    tx.encode(&message, b"", sequence, [1; NONCE_RANDOM_SIZE]).expect("next");
                let index = usize::from(bit / 8) % encoded.ciphertext.len();
                encoded.ciphertext[index] ^= 1 << (bit % 8);

                let before = (rx.generation(), rx.last_sequence());
                assert!(rx.decode(&encoded, b"", sequence).is_err());
                assert_eq!(before, (rx.generation(), rx.last_sequence()));
            },
        }

        assert!(tx.generation() >= generation.0);
        assert!(rx.generation() >= generation.1);
        assert_eq!(tx.generation(), tx.last_sequence() / u64::from(ppe));
        assert_eq!(rx.generation(), rx.last_sequence() / u64::from(ppe));
    }
});
