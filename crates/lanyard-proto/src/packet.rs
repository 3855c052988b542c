//! Packet type combining header and body.
//!
//! Layout on the wire: `[PacketHeader: 12 bytes] + [body: variable bytes]`.
//! The body extends to the end of the buffer; framing of packets on a stream
//! transport is the caller's concern.

use bytes::{BufMut, Bytes};

use crate::{
    BodyType, PacketHeader,
    errors::{ProtocolError, Result},
};

/// Maximum body size (16 MB)
pub const MAX_BODY_SIZE: usize = 16 * 1024 * 1024;

/// Complete transport packet.
///
/// Holds the raw body bytes; handshake bodies are decoded separately with
/// [`crate::HandshakeEnvelope::decode`].
///
/// # Invariants
///
/// - `body.len() <= MAX_BODY_SIZE`, enforced by [`Packet::encode`] and
///   [`Packet::decode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Packet header
    pub header: PacketHeader,

    /// Raw body bytes
    pub body: Bytes,
}

impl Packet {
    /// Create a packet from a header and body.
    #[must_use]
    pub fn new(header: PacketHeader, body: impl Into<Bytes>) -> Self {
        Self { header, body: body.into() }
    }

    /// Create a payload packet at the given sequence number.
    #[must_use]
    pub fn payload(sequence: u64, body: impl Into<Bytes>) -> Self {
        Self::new(PacketHeader::new(BodyType::Payload, sequence), body)
    }

    /// Encode packet into buffer.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::BodyTooLarge` if body exceeds [`MAX_BODY_SIZE`]
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        if self.body.len() > MAX_BODY_SIZE {
            return Err(ProtocolError::BodyTooLarge { size: self.body.len(), max: MAX_BODY_SIZE });
        }

        dst.put_slice(&self.header.to_bytes());
        dst.put_slice(&self.body);
        Ok(())
    }

    /// Encode packet into a freshly allocated vector.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::BodyTooLarge` if body exceeds [`MAX_BODY_SIZE`]
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(PacketHeader::SIZE + self.body.len());
        self.encode(&mut out)?;
        Ok(out)
    }

    /// Decode a packet from a complete buffer.
    ///
    /// # Errors
    ///
    /// - Any header error from [`PacketHeader::from_bytes`]
    /// - `ProtocolError::BodyTooLarge` if the body exceeds [`MAX_BODY_SIZE`]
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let header = *PacketHeader::from_bytes(bytes)?;
        let body = &bytes[PacketHeader::SIZE..];

        if body.len() > MAX_BODY_SIZE {
            return Err(ProtocolError::BodyTooLarge { size: body.len(), max: MAX_BODY_SIZE });
        }

        Ok(Self { header, body: Bytes::copy_from_slice(body) })
    }
}
