//! Node identities and their signatures.
//!
//! A party is identified by a two-level Ed25519 chain: a long-term root key
//! signs a node key, and the node key signs everything the node says during a
//! handshake (its ephemeral key and every handshake message). Only the public
//! halves travel on the wire.
//!
//! # Security
//!
//! All verification uses `verify_strict`, which rejects small-order keys and
//! malleable signatures.

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use sha2::{Digest, Sha256};
use x25519_dalek::PublicKey;

use crate::{error::IdentityError, exchange::EphemeralKeyPair};

/// Domain separator for the root's signature over a node key
const NODE_LABEL: &[u8] = b"lanyard-node";

/// Domain separator for the node's signature over an ephemeral key
const EPHEMERAL_LABEL: &[u8] = b"lanyard-ephemeral";

/// Domain separator for handshake message signatures
const HANDSHAKE_LABEL: &[u8] = b"lanyard-handshake";

/// Ed25519 public key size
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Ed25519 signature size
pub const SIGNATURE_SIZE: usize = 64;

fn labelled(label: &[u8], bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(label.len() + bytes.len());
    out.extend_from_slice(label);
    out.extend_from_slice(bytes);
    out
}

fn parse_verifying_key(kind: &'static str, bytes: &[u8]) -> Result<VerifyingKey, IdentityError> {
    let array = <[u8; PUBLIC_KEY_SIZE]>::try_from(bytes).map_err(|_| {
        IdentityError::InvalidKey { kind, reason: format!("expected 32 bytes, got {}", bytes.len()) }
    })?;
    VerifyingKey::from_bytes(&array)
        .map_err(|e| IdentityError::InvalidKey { kind, reason: e.to_string() })
}

fn parse_signature(kind: &'static str, bytes: &[u8]) -> Result<Signature, IdentityError> {
    Signature::from_slice(bytes).map_err(|_| IdentityError::InvalidSignature { kind })
}

/// Public identity of a node: root key, node key and the binding between
/// them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityChain {
    root_key: VerifyingKey,
    node_key: VerifyingKey,
    node_signature: Signature,
}

impl IdentityChain {
    /// Parse and verify a chain from wire bytes.
    ///
    /// # Errors
    ///
    /// - `IdentityError::InvalidKey` if either key is malformed
    /// - `IdentityError::InvalidSignature` if the root did not sign the node
    ///   key
    pub fn from_parts(
        root_key: &[u8],
        node_key: &[u8],
        node_signature: &[u8],
    ) -> Result<Self, IdentityError> {
        let chain = Self {
            root_key: parse_verifying_key("root", root_key)?,
            node_key: parse_verifying_key("node", node_key)?,
            node_signature: parse_signature("node", node_signature)?,
        };
        chain.verify()?;
        Ok(chain)
    }

    /// Check that the root key signed the node key.
    pub fn verify(&self) -> Result<(), IdentityError> {
        self.root_key
            .verify_strict(&labelled(NODE_LABEL, self.node_key.as_bytes()), &self.node_signature)
            .map_err(|_| IdentityError::InvalidSignature { kind: "node" })
    }

    /// Long-term root key.
    pub fn root_key(&self) -> &VerifyingKey {
        &self.root_key
    }

    /// Node key that signs handshake traffic.
    pub fn node_key(&self) -> &VerifyingKey {
        &self.node_key
    }

    /// Root signature over the node key.
    pub fn node_signature(&self) -> &Signature {
        &self.node_signature
    }

    /// Returns true if both chains name the same root and node keys.
    pub fn matches(&self, other: &Self) -> bool {
        self.root_key == other.root_key && self.node_key == other.node_key
    }

    /// SHA-256 over `root_key || node_key`, for display and pinning stores.
    pub fn fingerprint(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.root_key.as_bytes());
        hasher.update(self.node_key.as_bytes());
        hasher.finalize().into()
    }

    /// Verify a handshake signature made by this chain's node key.
    ///
    /// # Errors
    ///
    /// - `IdentityError::InvalidSignature` if `signature` is malformed or does
    ///   not verify
    pub fn verify_handshake(&self, message: &[u8], signature: &[u8]) -> Result<(), IdentityError> {
        let signature = parse_signature("handshake", signature)?;
        self.node_key
            .verify_strict(&labelled(HANDSHAKE_LABEL, message), &signature)
            .map_err(|_| IdentityError::InvalidSignature { kind: "handshake" })
    }
}

/// Identity of the local node, including its node signing key.
///
/// The root signing key is only needed to certify the node key and is not
/// retained.
#[derive(Clone)]
pub struct LocalIdentity {
    chain: IdentityChain,
    node_signing_key: SigningKey,
}

impl LocalIdentity {
    /// Certify `node_signing_key` under `root`.
    pub fn new(root: &SigningKey, node_signing_key: SigningKey) -> Self {
        let node_key = node_signing_key.verifying_key();
        let node_signature = root.sign(&labelled(NODE_LABEL, node_key.as_bytes()));

        Self {
            chain: IdentityChain { root_key: root.verifying_key(), node_key, node_signature },
            node_signing_key,
        }
    }

    /// Build an identity from 32-byte root and node seeds.
    pub fn from_seeds(root_seed: &[u8; 32], node_seed: &[u8; 32]) -> Self {
        Self::new(&SigningKey::from_bytes(root_seed), SigningKey::from_bytes(node_seed))
    }

    /// Public half of this identity.
    pub fn chain(&self) -> &IdentityChain {
        &self.chain
    }

    /// Sign a handshake message with the node key.
    pub fn sign_handshake(&self, message: &[u8]) -> Signature {
        self.node_signing_key.sign(&labelled(HANDSHAKE_LABEL, message))
    }

    /// Announce an ephemeral key under this identity.
    pub fn announce(&self, ephemeral: &EphemeralKeyPair) -> NodeAnnouncement {
        let ephemeral_key = *ephemeral.public_key();
        let ephemeral_signature =
            self.node_signing_key.sign(&labelled(EPHEMERAL_LABEL, ephemeral_key.as_bytes()));

        NodeAnnouncement { chain: self.chain.clone(), ephemeral_key, ephemeral_signature }
    }
}

impl std::fmt::Debug for LocalIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalIdentity").field("chain", &self.chain).finish_non_exhaustive()
    }
}

/// A node's identity chain plus a signed ephemeral X25519 key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeAnnouncement {
    chain: IdentityChain,
    ephemeral_key: PublicKey,
    ephemeral_signature: Signature,
}

impl NodeAnnouncement {
    /// Parse and verify an announcement from wire bytes.
    ///
    /// # Errors
    ///
    /// - `IdentityError::InvalidKey` for malformed keys
    /// - `IdentityError::InvalidSignature` if the chain or the ephemeral
    ///   signature does not verify
    pub fn from_parts(
        chain: IdentityChain,
        ephemeral_key: &[u8],
        ephemeral_signature: &[u8],
    ) -> Result<Self, IdentityError> {
        let ephemeral_key = <[u8; 32]>::try_from(ephemeral_key).map_err(|_| {
            IdentityError::InvalidKey {
                kind: "ephemeral",
                reason: format!("expected 32 bytes, got {}", ephemeral_key.len()),
            }
        })?;

        let announcement = Self {
            chain,
            ephemeral_key: PublicKey::from(ephemeral_key),
            ephemeral_signature: parse_signature("ephemeral", ephemeral_signature)?,
        };
        announcement.verify()?;
        Ok(announcement)
    }

    /// Check the chain binding and the node's signature over the ephemeral
    /// key.
    pub fn verify(&self) -> Result<(), IdentityError> {
        self.chain.verify()?;
        self.chain
            .node_key
            .verify_strict(
                &labelled(EPHEMERAL_LABEL, self.ephemeral_key.as_bytes()),
                &self.ephemeral_signature,
            )
            .map_err(|_| IdentityError::InvalidSignature { kind: "ephemeral" })
    }

    /// Announced identity chain.
    pub fn chain(&self) -> &IdentityChain {
        &self.chain
    }

    /// Announced ephemeral public key.
    pub fn ephemeral_key(&self) -> &PublicKey {
        &self.ephemeral_key
    }

    /// Node signature over the ephemeral key.
    pub fn ephemeral_signature(&self) -> &Signature {
        &self.ephemeral_signature
    }
}
