//! Property-based tests for the key-evolution ratchet
//!
//! 1. **Round-trip**: decode(encode(m)) == m for any plaintext, aad and
//!    reachable sequence number
//! 2. **Monotonicity**: generation never decreases across any operation
//!    sequence, successful or not
//! 3. **Gap tolerance**: jumping N generations yields the key obtained by N
//!    evolutions
//! 4. **Atomicity**: a tampered packet leaves the decoder untouched

use lanyard_crypto::{
    Direction, MIN_PACKETS_PER_EVOLUTION, StreamCipher, StreamError, StreamKey,
};
use proptest::prelude::*;

const PPE: u64 = MIN_PACKETS_PER_EVOLUTION as u64;

fn key_from(seed: u8) -> StreamKey {
    let mut random = [0u8; 64];
    for (i, byte) in random.iter_mut().enumerate() {
        *byte = seed.wrapping_add(i as u8);
    }
    StreamKey::generate(&random, MIN_PACKETS_PER_EVOLUTION).unwrap()
}

fn pair(seed: u8) -> (StreamCipher, StreamCipher) {
    (
        StreamCipher::new(key_from(seed), Direction::Encode),
        StreamCipher::new(key_from(seed), Direction::Decode),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_encode_decode_roundtrip(
        seed in any::<u8>(),
        plaintext in prop::collection::vec(any::<u8>(), 0..1000),
        aad in prop::collection::vec(any::<u8>(), 0..64),
        sequence in 1u64..(PPE * 64),
        suffix in any::<[u8; 8]>(),
    ) {
        let (mut tx, mut rx) = pair(seed);

        let encoded = tx.encode(&plaintext, &aad, sequence, suffix).unwrap();
        let decoded = rx.decode(&encoded, &aad, sequence).unwrap();

        prop_assert_eq!(decoded, plaintext);
        prop_assert_eq!(tx.generation(), rx.generation());
    }

    #[test]
    fn prop_generation_is_monotonic(
        sequences in prop::collection::vec(0u64..(PPE * 32), 1..40),
    ) {
        let (mut tx, _) = pair(1);
        let mut previous = tx.generation();

        for sequence in sequences {
            let result = tx.encode(b"x", b"", sequence, [0; 8]);
            if sequence / PPE < previous {
                let is_regression = matches!(result, Err(StreamError::SequenceRegression { .. }));
                prop_assert!(is_regression);
            } else {
                prop_assert!(result.is_ok());
            }

            prop_assert!(tx.generation() >= previous);
            prop_assert_eq!(tx.generation(), tx.last_sequence() / PPE);
            previous = tx.generation();
        }
    }

    #[test]
    fn prop_gap_equals_repeated_evolution(
        seed in any::<u8>(),
        generations in 0u64..200,
        offset in 0u64..PPE,
    ) {
        let (mut tx, _) = pair(seed);
        tx.encode(b"x", b"", generations * PPE + offset, [0; 8]).unwrap();

        let mut expected = key_from(seed);
        for _ in 0..generations {
            expected = expected.evolve();
        }

        prop_assert_eq!(tx.generation(), generations);
        prop_assert_eq!(tx.key().cipher_key(), expected.cipher_key());
    }

    #[test]
    fn prop_tamper_leaves_state_unchanged(
        plaintext in prop::collection::vec(any::<u8>(), 1..256),
        sequence in 1u64..(PPE * 16),
        flip_index in any::<prop::sample::Index>(),
        flip in 1u8..=255,
    ) {
        let (mut tx, mut rx) = pair(7);
        let mut encoded = tx.encode(&plaintext, b"hdr", sequence, [3; 8]).unwrap();

        let index = flip_index.index(encoded.ciphertext.len());
        encoded.ciphertext[index] ^= flip;

        prop_assert_eq!(
            rx.decode(&encoded, b"hdr", sequence),
            Err(StreamError::AuthenticationFailure)
        );
        prop_assert_eq!(rx.generation(), 0);
        prop_assert_eq!(rx.last_sequence(), 0);
    }
}

#[test]
fn out_of_order_within_generation_then_regression() {
    let (mut tx, mut rx) = pair(9);

    let first = tx.encode(b"first", b"", 5, [0; 8]).unwrap();
    let second = tx.encode(b"second", b"", PPE + 1, [0; 8]).unwrap();

    assert_eq!(rx.decode(&second, b"", PPE + 1).unwrap(), b"second");
    assert!(matches!(
        rx.decode(&first, b"", 5),
        Err(StreamError::SequenceRegression { current: 1, requested: 0 })
    ));
}
