//! CBOR-encoded handshake messages.
//!
//! The handshake is three messages: `Seed` announces a node and its ephemeral
//! key, `Response` answers a seed with a wrapped stream key and the
//! responder's own seed, `Finish` completes the exchange with the
//! initiator's wrapped stream key.
//!
//! Messages travel inside a [`HandshakeEnvelope`], which pairs the CBOR
//! encoding of a [`Handshake`] with the sender's node signature over
//! `header || message`. Signing the exact received bytes avoids any
//! dependence on re-encoding being canonical.
//!
//! All key and signature fields are plain byte vectors here. Length and
//! point validation belongs to `lanyard-crypto`.

use serde::{Deserialize, Serialize};

use crate::{
    PacketHeader,
    errors::{ProtocolError, Result},
    packet::{MAX_BODY_SIZE, Packet},
};

/// Public identity and ephemeral key announced by a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Ed25519 root public key (32 bytes)
    pub root_key: Vec<u8>,
    /// Ed25519 node public key (32 bytes)
    pub node_key: Vec<u8>,
    /// Root signature over the node key (64 bytes)
    pub node_signature: Vec<u8>,
    /// X25519 ephemeral public key (32 bytes)
    pub ephemeral_key: Vec<u8>,
    /// Node signature over the ephemeral key (64 bytes)
    pub ephemeral_signature: Vec<u8>,
}

/// A single ECDH-based key agreement carrying a wrapped stream key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyExchange {
    /// Sender's one-time X25519 public key (32 bytes)
    pub sender_public: Vec<u8>,
    /// Opaque material the recipient needs to recover the stream key
    pub exchange_data: Vec<u8>,
}

/// First handshake message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seed {
    /// The sender's announced node
    pub node: NodeInfo,
}

/// Second handshake message, sent by the party that received a `Seed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Responder's tx stream key, wrapped to the initiator's ephemeral key
    pub key_exchange: KeyExchange,
    /// Responder's own announcement
    pub seed: Seed,
}

/// Third handshake message, completing the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finish {
    /// Initiator's tx stream key, wrapped to the responder's ephemeral key
    pub key_exchange: KeyExchange,
}

/// Handshake message variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandshakePayload {
    /// Node announcement
    Seed(Seed),
    /// Answer to a seed
    Response(Response),
    /// Completion of the exchange
    Finish(Finish),
}

impl HandshakePayload {
    /// Short name of the variant, for logs and errors.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Seed(_) => "seed",
            Self::Response(_) => "response",
            Self::Finish(_) => "finish",
        }
    }
}

/// Versioned handshake message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handshake {
    /// Handshake protocol version
    pub version: u32,
    /// Message content
    pub payload: HandshakePayload,
}

impl Handshake {
    /// Current handshake protocol version
    pub const VERSION: u32 = 1;

    /// Wrap a payload with the current version.
    #[must_use]
    pub fn new(payload: HandshakePayload) -> Self {
        Self { version: Self::VERSION, payload }
    }

    /// Encode to CBOR.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::CborEncode` if serialization fails
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        ciborium::ser::into_writer(self, &mut out)
            .map_err(|e| ProtocolError::CborEncode(e.to_string()))?;
        Ok(out)
    }

    /// Decode from CBOR and check the version.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::CborDecode` for invalid CBOR or unknown variants
    /// - `ProtocolError::UnsupportedVersion` if `version` is not current
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let handshake: Self = ciborium::de::from_reader(bytes)
            .map_err(|e| ProtocolError::CborDecode(e.to_string()))?;

        if handshake.version != Self::VERSION {
            return Err(ProtocolError::UnsupportedVersion(handshake.version));
        }

        Ok(handshake)
    }
}

/// Signed container for an encoded [`Handshake`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeEnvelope {
    /// CBOR-encoded [`Handshake`]
    pub message: Vec<u8>,
    /// Sender node's Ed25519 signature over `header || message`
    pub signature: Vec<u8>,
}

impl HandshakeEnvelope {
    /// Bytes covered by the envelope signature.
    #[must_use]
    pub fn signed_bytes(header: &PacketHeader, message: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(PacketHeader::SIZE + message.len());
        out.extend_from_slice(&header.to_bytes());
        out.extend_from_slice(message);
        out
    }

    /// Decode the inner handshake message.
    ///
    /// # Errors
    ///
    /// See [`Handshake::decode`].
    pub fn handshake(&self) -> Result<Handshake> {
        Handshake::decode(&self.message)
    }

    /// Encode into a handshake packet.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::CborEncode` if serialization fails
    pub fn into_packet(self) -> Result<Packet> {
        let mut body = Vec::new();
        ciborium::ser::into_writer(&self, &mut body)
            .map_err(|e| ProtocolError::CborEncode(e.to_string()))?;
        Ok(Packet::new(PacketHeader::handshake(), body))
    }

    /// Decode from a handshake packet body.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::BodyTooLarge` if the body exceeds [`MAX_BODY_SIZE`]
    /// - `ProtocolError::CborDecode` for invalid CBOR
    pub fn decode(body: &[u8]) -> Result<Self> {
        if body.len() > MAX_BODY_SIZE {
            return Err(ProtocolError::BodyTooLarge { size: body.len(), max: MAX_BODY_SIZE });
        }

        ciborium::de::from_reader(body).map_err(|e| ProtocolError::CborDecode(e.to_string()))
    }
}
