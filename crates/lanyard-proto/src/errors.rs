//! Errors raised while encoding or decoding wire data.

use thiserror::Error;

/// Result alias for wire codec operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors that can occur while parsing or producing packets.
///
/// Every variant means the bytes on the wire are structurally unusable. The
/// state machine maps all of them to a malformed-message fault.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Buffer ended before a complete header could be read
    #[error("packet too short: expected at least {expected} bytes, got {actual}")]
    PacketTooShort {
        /// Minimum number of bytes required
        expected: usize,
        /// Number of bytes available
        actual: usize,
    },

    /// Header does not start with the Lanyard magic bytes
    #[error("invalid magic number")]
    InvalidMagic,

    /// Packet or handshake version is not supported
    #[error("unsupported version: {0}")]
    UnsupportedVersion(u32),

    /// Header names a body type this codec does not know
    #[error("unknown body type: {0:#04x}")]
    UnknownBodyType(u8),

    /// Body exceeds the protocol limit
    #[error("body too large: {size} bytes (max {max})")]
    BodyTooLarge {
        /// Actual body size
        size: usize,
        /// Maximum allowed body size
        max: usize,
    },

    /// CBOR serialization failed
    #[error("CBOR encode error: {0}")]
    CborEncode(String),

    /// CBOR deserialization failed
    #[error("CBOR decode error: {0}")]
    CborDecode(String),
}
