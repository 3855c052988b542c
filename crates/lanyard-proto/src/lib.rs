//! Wire format for the Lanyard transport.
//!
//! Every unit exchanged between two transport contexts is a [`Packet`]: a
//! fixed 12-byte raw binary header followed by a variable-length body. The
//! header carries the body type and the stream sequence number, and doubles
//! as the associated data for payload encryption, so a packet's sequence
//! number cannot be rewritten without breaking its authentication tag.
//!
//! Handshake bodies are CBOR. Payload bodies are opaque AEAD output and are
//! never parsed here beyond their length.
//!
//! # Security
//!
//! Header parsing uses compile-time verified layouts via `zerocopy`. Bodies
//! are capped at [`MAX_BODY_SIZE`] before any CBOR parsing happens. Nothing in
//! this crate authenticates anything: signatures and tags are checked by the
//! state machine in `lanyard-core`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod errors;
pub mod handshake;
pub mod header;
pub mod packet;

pub use errors::{ProtocolError, Result};
pub use handshake::{
    Finish, Handshake, HandshakeEnvelope, HandshakePayload, KeyExchange, NodeInfo, Response, Seed,
};
pub use header::{BodyType, PacketHeader};
pub use packet::{MAX_BODY_SIZE, Packet};
