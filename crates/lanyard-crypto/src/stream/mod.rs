//! Key-evolution ratchet.
//!
//! Each direction of a transport owns one stream. A stream encrypts packets
//! under a key that evolves every `packets_per_evolution` sequence numbers:
//!
//! ```text
//! generation = sequence / packets_per_evolution
//! cipher_key[g+1] = HMAC-SHA256(evolution_key, cipher_key[g])
//! ```
//!
//! Evolution is one-way. A receiver that has advanced past a generation can
//! never decrypt packets from it again, which bounds the damage of a leaked
//! key to the current generation and later ones.

mod cipher;
mod iv;
mod key;
mod shared;

pub use cipher::{CipherResult, Direction, MAX_GENERATION_SKIP, StreamCipher, TAG_SIZE};
pub use iv::{IvFactory, NONCE_RANDOM_SIZE, NONCE_SIZE};
pub use key::{
    DEFAULT_PACKETS_PER_EVOLUTION, MAX_PACKETS_PER_EVOLUTION, MIN_PACKETS_PER_EVOLUTION,
    STREAM_KEY_SIZE, StreamKey,
};
pub use shared::Stream;
