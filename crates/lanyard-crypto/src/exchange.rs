//! Ephemeral key agreement and stream key wrapping.
//!
//! A key exchange transports one [`StreamKey`] to the holder of an announced
//! ephemeral X25519 key:
//!
//! ```text
//! shared   = X25519(sender_secret, recipient_public)
//! wrap_key = HKDF-SHA256(salt = psk, ikm = shared,
//!                        info = label || sender_public || recipient_public)
//! data     = nonce || XChaCha20-Poly1305(wrap_key, nonce, cbor(stream_key),
//!                                        aad = sender_public || recipient_public)
//! ```
//!
//! The sender uses a fresh one-time secret per exchange, so compromise of a
//! long-term key reveals nothing about past stream keys. Mixing a pre-shared
//! key into the salt means both sides must agree on it for the unwrap to
//! authenticate.

use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit, Payload},
};
use hkdf::Hkdf;
use sha2::Sha256;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::{
    error::KeyExchangeError,
    stream::{NONCE_SIZE, StreamKey, TAG_SIZE},
};

/// X25519 key size
pub const X25519_KEY_SIZE: usize = 32;

/// HKDF label for the wrapping key
const WRAP_LABEL: &[u8] = b"lanyard-key-exchange";

/// X25519 key pair announced for a single handshake.
#[derive(Clone)]
pub struct EphemeralKeyPair {
    secret: StaticSecret,
    public: PublicKey,
}

impl EphemeralKeyPair {
    /// Build a key pair from 32 secret bytes.
    ///
    /// Caller MUST provide cryptographically secure random bytes in
    /// production.
    pub fn from_secret_bytes(bytes: [u8; X25519_KEY_SIZE]) -> Self {
        let secret = StaticSecret::from(bytes);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Public half.
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }
}

impl std::fmt::Debug for EphemeralKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EphemeralKeyPair").field("public", &self.public).finish_non_exhaustive()
    }
}

/// Wire material of one key exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyExchangeMaterial {
    /// Sender's one-time public key
    pub sender_public: [u8; X25519_KEY_SIZE],
    /// `nonce || ciphertext` of the wrapped stream key
    pub exchange_data: Vec<u8>,
}

impl KeyExchangeMaterial {
    /// Wrap `stream_key` for the holder of `recipient`.
    ///
    /// `sender_secret` and `nonce` MUST be fresh random bytes.
    ///
    /// # Errors
    ///
    /// - `KeyExchangeError::InvalidPublicKey` if `recipient` is a low-order
    ///   point
    /// - `KeyExchangeError::Encoding` if the stream key cannot be serialized
    pub fn seal(
        stream_key: &StreamKey,
        recipient: &PublicKey,
        sender_secret: [u8; X25519_KEY_SIZE],
        nonce: [u8; NONCE_SIZE],
        psk: Option<&[u8]>,
    ) -> Result<Self, KeyExchangeError> {
        let sender = EphemeralKeyPair::from_secret_bytes(sender_secret);
        let sender_public = sender.public.to_bytes();

        let wrap_key =
            wrap_key(&sender.secret, recipient, &sender_public, recipient.as_bytes(), psk)?;
        let plaintext = stream_key.to_cbor()?;
        let aad = binding(&sender_public, recipient.as_bytes());

        let cipher = XChaCha20Poly1305::new((&*wrap_key).into());
        let Ok(ciphertext) =
            cipher.encrypt(XNonce::from_slice(&nonce), Payload { msg: &plaintext, aad: &aad })
        else {
            unreachable!("XChaCha20-Poly1305 encryption cannot fail with valid inputs");
        };

        let mut exchange_data = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        exchange_data.extend_from_slice(&nonce);
        exchange_data.extend_from_slice(&ciphertext);

        Ok(Self { sender_public, exchange_data })
    }

    /// Parse wire fields.
    ///
    /// # Errors
    ///
    /// - `KeyExchangeError::InvalidPublicKey` if `sender_public` is not 32
    ///   bytes
    /// - `KeyExchangeError::MalformedExchange` if `exchange_data` is shorter
    ///   than nonce plus tag
    pub fn from_parts(sender_public: &[u8], exchange_data: &[u8]) -> Result<Self, KeyExchangeError> {
        let sender_public = <[u8; X25519_KEY_SIZE]>::try_from(sender_public).map_err(|_| {
            KeyExchangeError::InvalidPublicKey(format!(
                "expected {X25519_KEY_SIZE} bytes, got {}",
                sender_public.len()
            ))
        })?;

        if exchange_data.len() < NONCE_SIZE + TAG_SIZE {
            return Err(KeyExchangeError::MalformedExchange(format!(
                "{} bytes is shorter than nonce and tag",
                exchange_data.len()
            )));
        }

        Ok(Self { sender_public, exchange_data: exchange_data.to_vec() })
    }

    /// Recover the stream key with the recipient's ephemeral secret.
    ///
    /// # Errors
    ///
    /// - `KeyExchangeError::InvalidPublicKey` if the sender key is a
    ///   low-order point
    /// - `KeyExchangeError::MalformedExchange` if the data is truncated
    /// - `KeyExchangeError::UnwrapFailed` if the ciphertext does not
    ///   authenticate (wrong recipient or PSK mismatch)
    /// - `KeyExchangeError::Encoding` if the unwrapped key is invalid
    pub fn open(
        &self,
        recipient: &EphemeralKeyPair,
        psk: Option<&[u8]>,
    ) -> Result<StreamKey, KeyExchangeError> {
        if self.exchange_data.len() < NONCE_SIZE + TAG_SIZE {
            return Err(KeyExchangeError::MalformedExchange(format!(
                "{} bytes is shorter than nonce and tag",
                self.exchange_data.len()
            )));
        }

        let sender = PublicKey::from(self.sender_public);
        let recipient_public = recipient.public.to_bytes();
        let wrap_key =
            wrap_key(&recipient.secret, &sender, &self.sender_public, &recipient_public, psk)?;
        let aad = binding(&self.sender_public, &recipient_public);

        let (nonce, ciphertext) = self.exchange_data.split_at(NONCE_SIZE);
        let cipher = XChaCha20Poly1305::new((&*wrap_key).into());
        let plaintext = Zeroizing::new(
            cipher
                .decrypt(XNonce::from_slice(nonce), Payload { msg: ciphertext, aad: &aad })
                .map_err(|_| KeyExchangeError::UnwrapFailed)?,
        );

        StreamKey::from_cbor(&plaintext)
    }
}

fn binding(sender_public: &[u8; 32], recipient_public: &[u8; 32]) -> [u8; 64] {
    let mut out = [0u8; 64];
    out[..32].copy_from_slice(sender_public);
    out[32..].copy_from_slice(recipient_public);
    out
}

fn wrap_key(
    secret: &StaticSecret,
    peer: &PublicKey,
    sender_public: &[u8; 32],
    recipient_public: &[u8; 32],
    psk: Option<&[u8]>,
) -> Result<Zeroizing<[u8; 32]>, KeyExchangeError> {
    let shared = secret.diffie_hellman(peer);
    if !shared.was_contributory() {
        return Err(KeyExchangeError::InvalidPublicKey("low-order point".to_string()));
    }

    let hkdf = Hkdf::<Sha256>::new(psk, shared.as_bytes());
    let mut key = Zeroizing::new([0u8; 32]);
    let Ok(()) = hkdf.expand_multi_info(
        &[WRAP_LABEL, sender_public.as_slice(), recipient_public.as_slice()],
        &mut *key,
    )
    else {
        unreachable!("32 bytes is a valid HKDF-SHA256 output length");
    };
    Ok(key)
}
