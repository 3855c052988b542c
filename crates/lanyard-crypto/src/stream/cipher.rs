//! Key-evolving stream cipher.
//!
//! # Security Properties
//!
//! - Forward Secrecy: each generation's key is derived from the previous one
//!   by HMAC; the previous key is dropped (and zeroized) once superseded
//! - Gap Tolerance: a jump of N generations costs exactly N evolutions,
//!   regardless of how many packets were skipped. Encode accepts any forward
//!   gap; decode caps it at [`MAX_GENERATION_SKIP`] since the sequence number
//!   comes off the wire
//! - Atomicity: a failed decode leaves key, generation and sequence untouched

use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit, Payload},
};

use super::{
    iv::{IvFactory, NONCE_RANDOM_SIZE, NONCE_SIZE},
    key::StreamKey,
};
use crate::error::StreamError;

/// Poly1305 tag size (16 bytes)
pub const TAG_SIZE: usize = 16;

/// Maximum number of generations a single decode may evolve through.
/// Bounds the work an unauthenticated sequence number can trigger.
pub const MAX_GENERATION_SKIP: u64 = 65_536;

/// Which way a stream moves data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Stream encrypts outbound packets
    Encode,
    /// Stream decrypts inbound packets
    Decode,
}

/// Output of a stream encode: nonce plus ciphertext with tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherResult {
    /// The 24-byte `XChaCha20` nonce
    pub nonce: [u8; NONCE_SIZE],
    /// The ciphertext including 16-byte Poly1305 tag
    pub ciphertext: Vec<u8>,
}

impl CipherResult {
    /// Plaintext length (ciphertext length minus authentication tag).
    pub fn plaintext_len(&self) -> usize {
        self.ciphertext.len().saturating_sub(TAG_SIZE)
    }

    /// Serialize as `nonce || ciphertext`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(NONCE_SIZE + self.ciphertext.len());
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Parse `nonce || ciphertext`.
    ///
    /// # Errors
    ///
    /// - `StreamError::MalformedCiphertext` if shorter than nonce plus tag
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StreamError> {
        if bytes.len() < NONCE_SIZE + TAG_SIZE {
            return Err(StreamError::MalformedCiphertext { len: bytes.len() });
        }

        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&bytes[..NONCE_SIZE]);
        Ok(Self { nonce, ciphertext: bytes[NONCE_SIZE..].to_vec() })
    }
}

/// Sequence-numbered, self-evolving AEAD stream for one direction.
///
/// # Invariants
///
/// - `generation == last_sequence / packets_per_evolution`
/// - `generation` never decreases
/// - `key` is the generation-`generation` evolution of the initial key
///
/// `clone()` is a deep copy; the copy evolves independently of the original.
#[derive(Clone)]
pub struct StreamCipher {
    key: StreamKey,
    iv_factory: IvFactory,
    last_sequence: u64,
    direction: Direction,
    generation: u64,
}

impl StreamCipher {
    /// Create a stream at generation 0, taking ownership of `key`.
    pub fn new(key: StreamKey, direction: Direction) -> Self {
        let iv_factory = IvFactory::new(key.evolution_key());
        Self { key, iv_factory, last_sequence: 0, direction, generation: 0 }
    }

    /// Direction this stream was created with.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Current key generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Sequence number of the last successful encode or decode (0 if none).
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    /// Sequence number following the last one used.
    ///
    /// # Errors
    ///
    /// - `StreamError::SequenceExhausted` at `u64::MAX`
    pub fn next_sequence(&self) -> Result<u64, StreamError> {
        self.last_sequence.checked_add(1).ok_or(StreamError::SequenceExhausted)
    }

    /// Current key (evolved to the current generation).
    pub fn key(&self) -> &StreamKey {
        &self.key
    }

    /// Encrypt `data` at `sequence`, authenticating `aad`.
    ///
    /// Evolves the key forward as needed and commits the new position only
    /// after the packet is produced.
    ///
    /// # Errors
    ///
    /// - `StreamError::WrongDirection` on a decode stream
    /// - `StreamError::SequenceRegression` if `sequence` maps to a past
    ///   generation
    pub fn encode(
        &mut self,
        data: &[u8],
        aad: &[u8],
        sequence: u64,
        random_suffix: [u8; NONCE_RANDOM_SIZE],
    ) -> Result<CipherResult, StreamError> {
        self.require_direction(Direction::Encode)?;
        let target = self.target_generation(sequence)?;
        let evolved = self.evolve_to(target);
        let key = evolved.as_ref().unwrap_or(&self.key);

        let nonce = self.iv_factory.nonce(sequence, random_suffix);
        let cipher = XChaCha20Poly1305::new(key.cipher_key().into());
        let Ok(ciphertext) = cipher.encrypt(XNonce::from_slice(&nonce), Payload { msg: data, aad })
        else {
            unreachable!("XChaCha20-Poly1305 encryption cannot fail with valid inputs");
        };

        self.commit(evolved, target, sequence);
        Ok(CipherResult { nonce, ciphertext })
    }

    /// Decrypt `result` at `sequence`, verifying `aad`.
    ///
    /// # Errors
    ///
    /// - `StreamError::WrongDirection` on an encode stream
    /// - `StreamError::SequenceRegression` if `sequence` maps to a past
    ///   generation
    /// - `StreamError::GenerationGapTooLarge` if more than
    ///   [`MAX_GENERATION_SKIP`] evolutions would be needed
    /// - `StreamError::AuthenticationFailure` if the tag does not verify; the
    ///   stream state is unchanged
    pub fn decode(
        &mut self,
        result: &CipherResult,
        aad: &[u8],
        sequence: u64,
    ) -> Result<Vec<u8>, StreamError> {
        self.require_direction(Direction::Decode)?;
        let target = self.target_generation(sequence)?;
        if target - self.generation > MAX_GENERATION_SKIP {
            return Err(StreamError::GenerationGapTooLarge {
                current: self.generation,
                requested: target,
            });
        }

        let evolved = self.evolve_to(target);
        let key = evolved.as_ref().unwrap_or(&self.key);

        let cipher = XChaCha20Poly1305::new(key.cipher_key().into());
        let plaintext = cipher
            .decrypt(XNonce::from_slice(&result.nonce), Payload {
                msg: &result.ciphertext,
                aad,
            })
            .map_err(|_| StreamError::AuthenticationFailure)?;

        self.commit(evolved, target, sequence);
        Ok(plaintext)
    }

    fn require_direction(&self, expected: Direction) -> Result<(), StreamError> {
        if self.direction == expected {
            Ok(())
        } else {
            Err(StreamError::WrongDirection { actual: self.direction })
        }
    }

    /// Generation `sequence` belongs to, if not already left behind.
    fn target_generation(&self, sequence: u64) -> Result<u64, StreamError> {
        let target = sequence / u64::from(self.key.packets_per_evolution());

        if target < self.generation {
            return Err(StreamError::SequenceRegression {
                current: self.generation,
                requested: target,
            });
        }

        Ok(target)
    }

    /// Key for `target`, or `None` if it is the current generation.
    ///
    /// One evolution per generation boundary crossed.
    fn evolve_to(&self, target: u64) -> Option<StreamKey> {
        if target == self.generation {
            return None;
        }

        let mut key = self.key.evolve();
        for _ in (self.generation + 1)..target {
            key = key.evolve();
        }
        Some(key)
    }

    fn commit(&mut self, evolved: Option<StreamKey>, target: u64, sequence: u64) {
        if let Some(key) = evolved {
            // Old key is zeroized by its Drop impl
            self.key = key;
            self.generation = target;
        }
        self.last_sequence = sequence;

        debug_assert_eq!(
            self.generation,
            self.last_sequence / u64::from(self.key.packets_per_evolution())
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::key::MIN_PACKETS_PER_EVOLUTION;

    const PPE: u64 = MIN_PACKETS_PER_EVOLUTION as u64;

    fn test_key() -> StreamKey {
        let mut random = [0u8; 64];
        for (i, byte) in random.iter_mut().enumerate() {
            *byte = (i * 3) as u8;
        }
        StreamKey::generate(&random, MIN_PACKETS_PER_EVOLUTION).unwrap()
    }

    fn pair() -> (StreamCipher, StreamCipher) {
        (
            StreamCipher::new(test_key(), Direction::Encode),
            StreamCipher::new(test_key(), Direction::Decode),
        )
    }

    #[test]
    fn new_stream_starts_at_generation_zero() {
        let (tx, _) = pair();
        assert_eq!(tx.generation(), 0);
        assert_eq!(tx.last_sequence(), 0);
        assert_eq!(tx.next_sequence().unwrap(), 1);
    }

    #[test]
    fn encode_decode_roundtrip() {
        let (mut tx, mut rx) = pair();

        let encoded = tx.encode(b"hello", b"aad", 1, [0; 8]).unwrap();
        let decoded = rx.decode(&encoded, b"aad", 1).unwrap();

        assert_eq!(decoded, b"hello");
        assert_eq!(tx.last_sequence(), 1);
        assert_eq!(rx.last_sequence(), 1);
    }

    #[test]
    fn ciphertext_is_plaintext_plus_tag() {
        let (mut tx, _) = pair();
        let encoded = tx.encode(b"twelve bytes", b"", 1, [0; 8]).unwrap();
        assert_eq!(encoded.ciphertext.len(), 12 + TAG_SIZE);
        assert_eq!(encoded.plaintext_len(), 12);
    }

    #[test]
    fn crossing_boundary_evolves_once() {
        let (mut tx, _) = pair();

        tx.encode(b"a", b"", PPE - 1, [0; 8]).unwrap();
        assert_eq!(tx.generation(), 0);

        tx.encode(b"b", b"", PPE, [0; 8]).unwrap();
        assert_eq!(tx.generation(), 1);
        assert_eq!(tx.key().cipher_key(), test_key().evolve().cipher_key());
    }

    #[test]
    fn gap_evolves_once_per_generation() {
        let (mut tx, mut rx) = pair();

        let encoded = tx.encode(b"far", b"", 5 * PPE + 3, [0; 8]).unwrap();
        assert_eq!(tx.generation(), 5);

        let mut expected = test_key();
        for _ in 0..5 {
            expected = expected.evolve();
        }
        assert_eq!(tx.key().cipher_key(), expected.cipher_key());

        assert_eq!(rx.decode(&encoded, b"", 5 * PPE + 3).unwrap(), b"far");
        assert_eq!(rx.generation(), 5);
    }

    #[test]
    fn regression_rejected() {
        let (mut tx, _) = pair();
        tx.encode(b"a", b"", 3 * PPE, [0; 8]).unwrap();

        let result = tx.encode(b"b", b"", PPE, [0; 8]);
        assert_eq!(result, Err(StreamError::SequenceRegression { current: 3, requested: 1 }));
        assert_eq!(tx.last_sequence(), 3 * PPE);
    }

    #[test]
    fn lower_sequence_in_same_generation_is_allowed() {
        let (mut tx, mut rx) = pair();
        let later = tx.encode(b"later", b"", 10, [0; 8]).unwrap();
        let earlier = tx.encode(b"earlier", b"", 4, [1; 8]).unwrap();

        assert_eq!(rx.decode(&later, b"", 10).unwrap(), b"later");
        assert_eq!(rx.decode(&earlier, b"", 4).unwrap(), b"earlier");
    }

    #[test]
    fn encode_accepts_any_forward_gap() {
        let (mut tx, _) = pair();
        tx.encode(b"a", b"", 1, [0; 8]).unwrap();

        let sequence = (MAX_GENERATION_SKIP + 1) * PPE;
        tx.encode(b"b", b"", sequence, [0; 8]).unwrap();
        assert_eq!(tx.generation(), MAX_GENERATION_SKIP + 1);
        assert_eq!(tx.last_sequence(), sequence);
    }

    #[test]
    fn decode_rejects_excessive_gap() {
        let (_, mut rx) = pair();
        let mut far_tx = StreamCipher::new(test_key(), Direction::Encode);
        let sequence = (MAX_GENERATION_SKIP + 1) * PPE;
        let encoded = far_tx.encode(b"x", b"", sequence, [0; 8]).unwrap();

        let result = rx.decode(&encoded, b"", sequence);
        assert_eq!(
            result,
            Err(StreamError::GenerationGapTooLarge {
                current: 0,
                requested: MAX_GENERATION_SKIP + 1
            })
        );
        assert_eq!(rx.generation(), 0);
        assert_eq!(rx.last_sequence(), 0);
    }

    #[test]
    fn decode_accepts_gap_at_limit() {
        let (mut tx, mut rx) = pair();
        let sequence = MAX_GENERATION_SKIP * PPE;
        let encoded = tx.encode(b"edge", b"", sequence, [0; 8]).unwrap();

        assert_eq!(rx.decode(&encoded, b"", sequence).unwrap(), b"edge");
        assert_eq!(rx.generation(), MAX_GENERATION_SKIP);
    }

    #[test]
    fn wrong_direction_rejected() {
        let (mut tx, mut rx) = pair();

        assert_eq!(
            rx.encode(b"x", b"", 1, [0; 8]),
            Err(StreamError::WrongDirection { actual: Direction::Decode })
        );

        let encoded = tx.encode(b"x", b"", 1, [0; 8]).unwrap();
        assert_eq!(
            tx.decode(&encoded, b"", 1),
            Err(StreamError::WrongDirection { actual: Direction::Encode })
        );
    }

    #[test]
    fn tampered_aad_fails_without_state_change() {
        let (mut tx, mut rx) = pair();
        let encoded = tx.encode(b"data", b"header", 2 * PPE, [0; 8]).unwrap();

        let result = rx.decode(&encoded, b"HEADER", 2 * PPE);
        assert_eq!(result, Err(StreamError::AuthenticationFailure));
        assert_eq!(rx.generation(), 0);
        assert_eq!(rx.last_sequence(), 0);

        assert_eq!(rx.decode(&encoded, b"header", 2 * PPE).unwrap(), b"data");
    }

    #[test]
    fn wrong_sequence_fails_authentication() {
        let (mut tx, mut rx) = pair();
        let encoded = tx.encode(b"data", b"", PPE, [0; 8]).unwrap();

        // Same nonce, but decoding at generation 0 uses the wrong key
        assert_eq!(rx.decode(&encoded, b"", 1), Err(StreamError::AuthenticationFailure));
    }

    #[test]
    fn clone_evolves_independently() {
        let (mut tx, _) = pair();
        tx.encode(b"a", b"", 1, [0; 8]).unwrap();

        let mut copy = tx.clone();
        copy.encode(b"b", b"", 3 * PPE, [0; 8]).unwrap();

        assert_eq!(copy.generation(), 3);
        assert_eq!(tx.generation(), 0);
        assert_eq!(tx.last_sequence(), 1);
    }

    #[test]
    fn cipher_result_bytes_roundtrip() {
        let (mut tx, _) = pair();
        let encoded = tx.encode(b"data", b"", 1, [9; 8]).unwrap();
        assert_eq!(CipherResult::from_bytes(&encoded.to_bytes()).unwrap(), encoded);
    }

    #[test]
    fn cipher_result_rejects_short_input() {
        let result = CipherResult::from_bytes(&[0u8; NONCE_SIZE + TAG_SIZE - 1]);
        assert_eq!(result, Err(StreamError::MalformedCiphertext { len: NONCE_SIZE + TAG_SIZE - 1 }));
    }
}
