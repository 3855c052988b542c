//! Packet header with zero-copy parsing.
//!
//! The `PacketHeader` is a fixed 12-byte structure serialized as raw binary
//! (Big Endian). The receiving state machine classifies a packet by reading
//! only these bytes.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::errors::{ProtocolError, Result};

/// Kind of body that follows a [`PacketHeader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BodyType {
    /// Signed CBOR handshake envelope
    Handshake = 0x01,
    /// AEAD-encrypted application data
    Payload = 0x02,
}

impl BodyType {
    /// Parse a body type from its wire value. `None` for unknown values.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::Handshake),
            0x02 => Some(Self::Payload),
            _ => None,
        }
    }

    /// Wire value of this body type.
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }
}

/// Fixed 12-byte packet header (Big Endian network byte order)
///
/// Layout:
///
/// ```text
/// 0      2         3           4                      12
/// ┌──────┬─────────┬───────────┬──────────────────────┐
/// │ "LY" │ version │ body_type │ sequence (u64, BE)   │
/// └──────┴─────────┴───────────┴──────────────────────┘
/// ```
///
/// Fields are stored as raw byte arrays so every 12-byte pattern is a valid
/// value and the struct can be cast directly from untrusted bytes.
///
/// # Invariants
///
/// - Handshake packets always carry sequence 0.
/// - Payload packets carry the sender's stream sequence number, which starts
///   at 1 and strictly increases per stream.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct PacketHeader {
    magic: [u8; 2],
    version: u8,
    body_type: u8,
    sequence: [u8; 8],
}

impl PacketHeader {
    /// Size of the serialized header
    pub const SIZE: usize = 12;

    /// Magic bytes: "LY"
    pub const MAGIC: [u8; 2] = *b"LY";

    /// Current packet format version
    pub const VERSION: u8 = 0x01;

    /// Create a header for the given body type and sequence number.
    #[must_use]
    pub fn new(body_type: BodyType, sequence: u64) -> Self {
        Self {
            magic: Self::MAGIC,
            version: Self::VERSION,
            body_type: body_type.to_u8(),
            sequence: sequence.to_be_bytes(),
        }
    }

    /// Header for a handshake packet.
    #[must_use]
    pub fn handshake() -> Self {
        Self::new(BodyType::Handshake, 0)
    }

    /// Parse a header from the front of `bytes` (zero-copy).
    ///
    /// # Errors
    ///
    /// - `ProtocolError::PacketTooShort` if fewer than 12 bytes are available
    /// - `ProtocolError::InvalidMagic` if the magic bytes do not match
    /// - `ProtocolError::UnsupportedVersion` for unknown versions
    /// - `ProtocolError::UnknownBodyType` for unknown body types
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        let (header, _) = Self::ref_from_prefix(bytes).map_err(|_| {
            ProtocolError::PacketTooShort { expected: Self::SIZE, actual: bytes.len() }
        })?;

        if header.magic != Self::MAGIC {
            return Err(ProtocolError::InvalidMagic);
        }

        if header.version != Self::VERSION {
            return Err(ProtocolError::UnsupportedVersion(u32::from(header.version)));
        }

        if BodyType::from_u8(header.body_type).is_none() {
            return Err(ProtocolError::UnknownBodyType(header.body_type));
        }

        Ok(header)
    }

    /// Raw header bytes, also used as AEAD associated data.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out.copy_from_slice(self.as_bytes());
        out
    }

    /// Packet format version.
    #[must_use]
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Body type. Always valid for headers produced by [`Self::new`] or
    /// accepted by [`Self::from_bytes`].
    #[must_use]
    pub fn body_type(&self) -> BodyType {
        BodyType::from_u8(self.body_type)
            .unwrap_or_else(|| unreachable!("body type validated on construction"))
    }

    /// Stream sequence number.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        u64::from_be_bytes(self.sequence)
    }
}

impl std::fmt::Debug for PacketHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketHeader")
            .field("version", &self.version)
            .field("body_type", &BodyType::from_u8(self.body_type))
            .field("sequence", &self.sequence())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_size_is_twelve_bytes() {
        assert_eq!(std::mem::size_of::<PacketHeader>(), PacketHeader::SIZE);
    }

    #[test]
    fn header_layout() {
        let header = PacketHeader::new(BodyType::Payload, 0x0102_0304_0506_0708);
        let bytes = header.to_bytes();

        assert_eq!(&bytes[0..2], b"LY");
        assert_eq!(bytes[2], PacketHeader::VERSION);
        assert_eq!(bytes[3], 0x02);
        assert_eq!(&bytes[4..12], &[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]);
    }

    #[test]
    fn parse_accepts_valid_header() {
        let header = PacketHeader::new(BodyType::Handshake, 0);
        let bytes = header.to_bytes();

        let parsed = PacketHeader::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.body_type(), BodyType::Handshake);
        assert_eq!(parsed.sequence(), 0);
        assert_eq!(*parsed, header);
    }

    #[test]
    fn parse_rejects_short_buffer() {
        let result = PacketHeader::from_bytes(&[0x4c, 0x59, 0x01]);
        assert_eq!(result, Err(ProtocolError::PacketTooShort { expected: 12, actual: 3 }));
    }

    #[test]
    fn parse_rejects_bad_magic() {
        let mut bytes = PacketHeader::handshake().to_bytes();
        bytes[0] = b'X';
        assert_eq!(PacketHeader::from_bytes(&bytes), Err(ProtocolError::InvalidMagic));
    }

    #[test]
    fn parse_rejects_unknown_version() {
        let mut bytes = PacketHeader::handshake().to_bytes();
        bytes[2] = 0x09;
        assert_eq!(PacketHeader::from_bytes(&bytes), Err(ProtocolError::UnsupportedVersion(9)));
    }

    #[test]
    fn parse_rejects_unknown_body_type() {
        let mut bytes = PacketHeader::handshake().to_bytes();
        bytes[3] = 0x7f;
        assert_eq!(PacketHeader::from_bytes(&bytes), Err(ProtocolError::UnknownBodyType(0x7f)));
    }
}
