//! Stream keys and their one-way evolution.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, Zeroizing};

use crate::error::{KeyExchangeError, StreamError};

type HmacSha256 = Hmac<Sha256>;

/// Length of the cipher and evolution keys
pub const STREAM_KEY_SIZE: usize = 32;

/// Smallest supported evolution interval
pub const MIN_PACKETS_PER_EVOLUTION: u32 = 64;

/// Largest supported evolution interval
pub const MAX_PACKETS_PER_EVOLUTION: u32 = 32_768;

/// Evolution interval used when none is configured
pub const DEFAULT_PACKETS_PER_EVOLUTION: u32 = 512;

/// Symmetric key material for one direction of a stream.
///
/// Immutable: [`evolve()`](Self::evolve) produces a new key and never
/// mutates in place. Key bytes are zeroized on drop.
///
/// # Invariants
///
/// - `packets_per_evolution` lies within
///   `MIN_PACKETS_PER_EVOLUTION..=MAX_PACKETS_PER_EVOLUTION`
/// - `cipher_key` and `evolution_key` are independent 32-byte strings
///
/// Equality compares key bytes in constant time.
#[derive(Clone)]
pub struct StreamKey {
    cipher_key: [u8; STREAM_KEY_SIZE],
    evolution_key: [u8; STREAM_KEY_SIZE],
    packets_per_evolution: u32,
    user_data: Option<Vec<u8>>,
}

impl StreamKey {
    /// Create a stream key from components.
    ///
    /// # Errors
    ///
    /// - `StreamError::InvalidEvolutionCount` if `packets_per_evolution` is
    ///   out of range
    pub fn new(
        cipher_key: [u8; STREAM_KEY_SIZE],
        evolution_key: [u8; STREAM_KEY_SIZE],
        packets_per_evolution: u32,
        user_data: Option<Vec<u8>>,
    ) -> Result<Self, StreamError> {
        if !(MIN_PACKETS_PER_EVOLUTION..=MAX_PACKETS_PER_EVOLUTION)
            .contains(&packets_per_evolution)
        {
            return Err(StreamError::InvalidEvolutionCount {
                count: packets_per_evolution,
                min: MIN_PACKETS_PER_EVOLUTION,
                max: MAX_PACKETS_PER_EVOLUTION,
            });
        }

        Ok(Self { cipher_key, evolution_key, packets_per_evolution, user_data })
    }

    /// Create a fresh stream key from 64 random bytes.
    ///
    /// Caller MUST provide cryptographically secure random bytes in
    /// production.
    pub fn generate(
        random: &[u8; 2 * STREAM_KEY_SIZE],
        packets_per_evolution: u32,
    ) -> Result<Self, StreamError> {
        let mut cipher_key = [0u8; STREAM_KEY_SIZE];
        let mut evolution_key = [0u8; STREAM_KEY_SIZE];
        cipher_key.copy_from_slice(&random[..STREAM_KEY_SIZE]);
        evolution_key.copy_from_slice(&random[STREAM_KEY_SIZE..]);

        Self::new(cipher_key, evolution_key, packets_per_evolution, None)
    }

    /// Current 32-byte cipher key.
    pub fn cipher_key(&self) -> &[u8; STREAM_KEY_SIZE] {
        &self.cipher_key
    }

    /// Key used to evolve the cipher key. Constant across evolutions.
    pub fn evolution_key(&self) -> &[u8; STREAM_KEY_SIZE] {
        &self.evolution_key
    }

    /// Number of packets encrypted under each generation.
    pub fn packets_per_evolution(&self) -> u32 {
        self.packets_per_evolution
    }

    /// Application data attached to this key, if any.
    pub fn user_data(&self) -> Option<&[u8]> {
        self.user_data.as_deref()
    }

    /// Same key with `user_data` replaced.
    #[must_use]
    pub fn with_user_data(mut self, user_data: Option<Vec<u8>>) -> Self {
        self.user_data = user_data;
        self
    }

    /// Derive the next generation's key.
    ///
    /// `cipher_key' = HMAC-SHA256(evolution_key, cipher_key)`. The evolution
    /// key, interval and user data carry forward unchanged. There is no
    /// inverse.
    #[must_use]
    pub fn evolve(&self) -> Self {
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.evolution_key) else {
            unreachable!("HMAC-SHA256 accepts any key size");
        };
        mac.update(&self.cipher_key);
        let digest = mac.finalize().into_bytes();

        let mut cipher_key = [0u8; STREAM_KEY_SIZE];
        cipher_key.copy_from_slice(&digest);

        Self {
            cipher_key,
            evolution_key: self.evolution_key,
            packets_per_evolution: self.packets_per_evolution,
            user_data: self.user_data.clone(),
        }
    }

    /// Serialize to CBOR for wrapping inside a key exchange.
    pub fn to_cbor(&self) -> Result<Zeroizing<Vec<u8>>, KeyExchangeError> {
        let wire = StreamKeyRef {
            cipher_key: &self.cipher_key,
            evolution_key: &self.evolution_key,
            packets_per_evolution: self.packets_per_evolution,
            user_data: self.user_data.as_deref(),
        };

        let mut out = Zeroizing::new(Vec::new());
        ciborium::ser::into_writer(&wire, &mut *out)
            .map_err(|e| KeyExchangeError::Encoding(e.to_string()))?;
        Ok(out)
    }

    /// Deserialize from CBOR produced by [`to_cbor`](Self::to_cbor).
    pub fn from_cbor(bytes: &[u8]) -> Result<Self, KeyExchangeError> {
        let mut wire: StreamKeyOwned = ciborium::de::from_reader(bytes)
            .map_err(|e| KeyExchangeError::Encoding(e.to_string()))?;

        let key = Self::new(
            wire.cipher_key,
            wire.evolution_key,
            wire.packets_per_evolution,
            wire.user_data.take(),
        )
        .map_err(|e| KeyExchangeError::Encoding(e.to_string()));

        wire.cipher_key.zeroize();
        wire.evolution_key.zeroize();
        key
    }
}

impl Drop for StreamKey {
    fn drop(&mut self) {
        self.cipher_key.zeroize();
        self.evolution_key.zeroize();
    }
}

impl PartialEq for StreamKey {
    fn eq(&self, other: &Self) -> bool {
        let keys = self.cipher_key[..].ct_eq(&other.cipher_key[..])
            & self.evolution_key[..].ct_eq(&other.evolution_key[..]);

        bool::from(keys)
            && self.packets_per_evolution == other.packets_per_evolution
            && self.user_data == other.user_data
    }
}

impl Eq for StreamKey {}

impl std::fmt::Debug for StreamKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamKey")
            .field("packets_per_evolution", &self.packets_per_evolution)
            .field("user_data_len", &self.user_data.as_ref().map(Vec::len))
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct StreamKeyRef<'a> {
    cipher_key: &'a [u8; STREAM_KEY_SIZE],
    evolution_key: &'a [u8; STREAM_KEY_SIZE],
    packets_per_evolution: u32,
    user_data: Option<&'a [u8]>,
}

#[derive(Deserialize)]
struct StreamKeyOwned {
    cipher_key: [u8; STREAM_KEY_SIZE],
    evolution_key: [u8; STREAM_KEY_SIZE],
    packets_per_evolution: u32,
    user_data: Option<Vec<u8>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> StreamKey {
        let mut random = [0u8; 64];
        for (i, byte) in random.iter_mut().enumerate() {
            *byte = i as u8;
        }
        StreamKey::generate(&random, DEFAULT_PACKETS_PER_EVOLUTION).unwrap()
    }

    #[test]
    fn generate_splits_random_bytes() {
        let key = test_key();
        assert_eq!(key.cipher_key()[0], 0);
        assert_eq!(key.evolution_key()[0], 32);
        assert_eq!(key.user_data(), None);
    }

    #[test]
    fn rejects_out_of_range_evolution_count() {
        for count in [0, MIN_PACKETS_PER_EVOLUTION - 1, MAX_PACKETS_PER_EVOLUTION + 1] {
            let result = StreamKey::new([1; 32], [2; 32], count, None);
            assert!(matches!(result, Err(StreamError::InvalidEvolutionCount { .. })));
        }

        assert!(StreamKey::new([1; 32], [2; 32], MIN_PACKETS_PER_EVOLUTION, None).is_ok());
        assert!(StreamKey::new([1; 32], [2; 32], MAX_PACKETS_PER_EVOLUTION, None).is_ok());
    }

    #[test]
    fn evolve_changes_only_cipher_key() {
        let key = test_key().with_user_data(Some(b"tag".to_vec()));
        let next = key.evolve();

        assert_ne!(next.cipher_key(), key.cipher_key());
        assert_eq!(next.evolution_key(), key.evolution_key());
        assert_eq!(next.packets_per_evolution(), key.packets_per_evolution());
        assert_eq!(next.user_data(), Some(&b"tag"[..]));
    }

    #[test]
    fn evolve_is_deterministic() {
        let key = test_key();
        assert_eq!(key.evolve(), key.evolve());
        assert_eq!(key.evolve().evolve(), test_key().evolve().evolve());
    }

    #[test]
    fn evolve_matches_hmac_definition() {
        let key = test_key();

        let mut mac = HmacSha256::new_from_slice(key.evolution_key()).unwrap();
        mac.update(key.cipher_key());
        let expected = mac.finalize().into_bytes();

        assert_eq!(key.evolve().cipher_key().as_slice(), expected.as_slice());
    }

    #[test]
    fn evolve_known_answer() {
        let once = test_key().evolve();
        assert_eq!(
            hex::encode(once.cipher_key()),
            "a27b86e7a70a029cba778d6f738d952696d6d8361b95103dd84ae9df6af063af"
        );
        assert_eq!(
            hex::encode(once.evolve().cipher_key()),
            "1d691ef6d820836924e6b4fa0995a17eae3b655d4676c0f423d24224a8aeefa2"
        );
    }

    #[test]
    fn equality_covers_every_field() {
        let key = test_key();
        assert_eq!(key, test_key());
        assert_ne!(key, key.evolve());
        assert_ne!(key, test_key().with_user_data(Some(b"tag".to_vec())));

        let other_evolution = StreamKey::new(*key.cipher_key(), [0; 32], 512, None).unwrap();
        assert_ne!(key, other_evolution);

        let other_interval = StreamKey::new(*key.cipher_key(), *key.evolution_key(), 64, None);
        assert_ne!(key, other_interval.unwrap());
    }

    #[test]
    fn cbor_roundtrip_preserves_user_data() {
        let key = test_key().with_user_data(Some(vec![0xAA; 5]));
        let bytes = key.to_cbor().unwrap();
        assert_eq!(StreamKey::from_cbor(&bytes).unwrap(), key);
    }

    #[test]
    fn from_cbor_rejects_invalid_interval() {
        let wire = StreamKeyRef {
            cipher_key: &[1; 32],
            evolution_key: &[2; 32],
            packets_per_evolution: 0,
            user_data: None,
        };
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(&wire, &mut bytes).unwrap();

        assert!(matches!(StreamKey::from_cbor(&bytes), Err(KeyExchangeError::Encoding(_))));
    }

    #[test]
    fn debug_does_not_leak_key_material() {
        let rendered = format!("{:?}", test_key());
        assert!(!rendered.contains("cipher_key"));
        assert!(rendered.contains("packets_per_evolution"));
    }
}
