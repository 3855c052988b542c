//! Per-packet nonce generation.

use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroize;

type HmacSha256 = Hmac<Sha256>;

/// Size of an `XChaCha20` nonce
pub const NONCE_SIZE: usize = 24;

/// Size of the random suffix in the nonce (8 bytes)
pub const NONCE_RANDOM_SIZE: usize = 8;

/// Size of the sequence-derived nonce prefix
const NONCE_PREFIX_SIZE: usize = NONCE_SIZE - NONCE_RANDOM_SIZE;

/// HKDF label for the IV key
const IV_KEY_LABEL: &[u8] = b"lanyard-stream-iv";

/// HMAC label mixed into every nonce prefix
const IV_LABEL: &[u8] = b"lanyard-iv";

/// Derives packet nonces for one stream.
///
/// Nonce structure:
/// - bytes 0-15: `HMAC-SHA256(iv_key, label || sequence)` truncated
/// - bytes 16-23: random suffix (caller-provided)
///
/// The prefix is unique per sequence number; the random suffix keeps nonces
/// distinct even if a caller re-encodes at a sequence number it already used.
#[derive(Clone)]
pub struct IvFactory {
    iv_key: [u8; 32],
}

impl IvFactory {
    /// Create a factory keyed from a stream's evolution key.
    pub fn new(evolution_key: &[u8; 32]) -> Self {
        let hkdf = Hkdf::<Sha256>::new(None, evolution_key);
        let mut iv_key = [0u8; 32];
        let Ok(()) = hkdf.expand(IV_KEY_LABEL, &mut iv_key) else {
            unreachable!("32 bytes is a valid HKDF-SHA256 output length");
        };
        Self { iv_key }
    }

    /// Build the nonce for `sequence`.
    pub fn nonce(&self, sequence: u64, random_suffix: [u8; NONCE_RANDOM_SIZE]) -> [u8; NONCE_SIZE] {
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.iv_key) else {
            unreachable!("HMAC-SHA256 accepts any key size");
        };
        mac.update(IV_LABEL);
        mac.update(&sequence.to_be_bytes());
        let digest = mac.finalize().into_bytes();

        let mut nonce = [0u8; NONCE_SIZE];
        nonce[..NONCE_PREFIX_SIZE].copy_from_slice(&digest[..NONCE_PREFIX_SIZE]);
        nonce[NONCE_PREFIX_SIZE..].copy_from_slice(&random_suffix);
        nonce
    }
}

impl Drop for IvFactory {
    fn drop(&mut self) {
        self.iv_key.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonce_is_deterministic_per_sequence() {
        let factory = IvFactory::new(&[7; 32]);
        assert_eq!(factory.nonce(5, [0; 8]), factory.nonce(5, [0; 8]));
    }

    #[test]
    fn nonce_prefix_differs_per_sequence() {
        let factory = IvFactory::new(&[7; 32]);
        let a = factory.nonce(1, [0; 8]);
        let b = factory.nonce(2, [0; 8]);
        assert_ne!(a[..NONCE_PREFIX_SIZE], b[..NONCE_PREFIX_SIZE]);
    }

    #[test]
    fn random_suffix_is_appended() {
        let factory = IvFactory::new(&[7; 32]);
        let nonce = factory.nonce(1, [0xAB; 8]);
        assert_eq!(&nonce[NONCE_PREFIX_SIZE..], &[0xAB; 8]);
    }

    #[test]
    fn different_streams_produce_different_nonces() {
        let a = IvFactory::new(&[1; 32]).nonce(1, [0; 8]);
        let b = IvFactory::new(&[2; 32]).nonce(1, [0; 8]);
        assert_ne!(a, b);
    }
}
