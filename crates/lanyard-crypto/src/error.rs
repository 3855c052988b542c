//! Error types for stream, identity and key exchange operations

use thiserror::Error;

/// Errors from stream ratchet operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    /// Sequence number maps to a generation the ratchet has already left.
    /// Evolution is one-way, so earlier keys cannot be re-derived.
    #[error("sequence regression: at generation {current}, sequence needs {requested}")]
    SequenceRegression {
        /// Current ratchet generation
        current: u64,
        /// Generation the sequence number maps to
        requested: u64,
    },

    /// Sequence number is too far ahead of the current generation
    #[error("generation gap too large: at generation {current}, sequence needs {requested}")]
    GenerationGapTooLarge {
        /// Current ratchet generation
        current: u64,
        /// Generation the sequence number maps to
        requested: u64,
    },

    /// AEAD tag did not verify (tampering, wrong key or wrong generation)
    #[error("authentication failed")]
    AuthenticationFailure,

    /// Encode called on a decode stream or vice versa
    #[error("wrong direction: stream is {actual:?}")]
    WrongDirection {
        /// Direction the stream was created with
        actual: crate::Direction,
    },

    /// Packets-per-evolution outside the supported range
    #[error("invalid evolution count {count}: must be within {min}..={max}")]
    InvalidEvolutionCount {
        /// Requested count
        count: u32,
        /// Minimum supported count
        min: u32,
        /// Maximum supported count
        max: u32,
    },

    /// Serialized cipher result is shorter than nonce plus tag
    #[error("malformed ciphertext: {len} bytes")]
    MalformedCiphertext {
        /// Length of the rejected buffer
        len: usize,
    },

    /// No further sequence numbers are available on this stream
    #[error("sequence space exhausted")]
    SequenceExhausted,
}

impl StreamError {
    /// Returns true if this error indicates the peer sent bad data.
    ///
    /// Local misuse (wrong direction, exhausted sequence space, bad
    /// configuration) is not a peer fault.
    pub fn is_peer_fault(&self) -> bool {
        match self {
            Self::SequenceRegression { .. }
            | Self::GenerationGapTooLarge { .. }
            | Self::AuthenticationFailure
            | Self::MalformedCiphertext { .. } => true,

            Self::WrongDirection { .. }
            | Self::InvalidEvolutionCount { .. }
            | Self::SequenceExhausted => false,
        }
    }
}

/// Errors from identity parsing and signature checks
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// Key bytes are not a valid public key
    #[error("invalid {kind} key: {reason}")]
    InvalidKey {
        /// Which key was rejected
        kind: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// Signature does not verify under the expected key
    #[error("invalid {kind} signature")]
    InvalidSignature {
        /// Which signature failed
        kind: &'static str,
    },
}

/// Errors from key exchange sealing and opening
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyExchangeError {
    /// Public key has the wrong length or is a low-order point
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Exchange data is too short or otherwise unusable
    #[error("malformed exchange data: {0}")]
    MalformedExchange(String),

    /// Wrapped stream key failed to authenticate (wrong key or PSK)
    #[error("stream key unwrap failed")]
    UnwrapFailed,

    /// Stream key (de)serialization failed
    #[error("stream key encoding: {0}")]
    Encoding(String),
}
