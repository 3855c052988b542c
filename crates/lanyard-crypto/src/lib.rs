//! Cryptographic primitives for the Lanyard transport.
//!
//! Provides the three building blocks the handshake state machine composes:
//!
//! - [`stream`]: the key-evolution ratchet that protects payload packets
//! - [`identity`]: Ed25519 root/node identity chains and signatures
//! - [`exchange`]: X25519 key agreement that wraps a stream key for a peer
//!
//! # Randomness
//!
//! Nothing in this crate draws randomness itself. Every function that needs
//! fresh bytes takes them as an argument, so the caller decides between the
//! operating system RNG and a seeded generator for deterministic tests.
//!
//! # Security
//!
//! Secret key material is zeroized on drop. Debug output of secret-bearing
//! types never includes key bytes.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod error;
pub mod exchange;
pub mod identity;
pub mod stream;

pub use error::{IdentityError, KeyExchangeError, StreamError};
pub use exchange::{EphemeralKeyPair, KeyExchangeMaterial, X25519_KEY_SIZE};
pub use identity::{IdentityChain, LocalIdentity, NodeAnnouncement};
pub use stream::{
    CipherResult, DEFAULT_PACKETS_PER_EVOLUTION, Direction, MAX_PACKETS_PER_EVOLUTION,
    MIN_PACKETS_PER_EVOLUTION, NONCE_RANDOM_SIZE, Stream, StreamCipher, StreamKey,
};
