//! Conversions between wire messages and verified crypto types.
//!
//! `lanyard-proto` carries keys as untyped byte vectors and `lanyard-crypto`
//! knows nothing about the wire, so parsing (and with it, signature
//! verification of announcements) happens here.

use lanyard_crypto::{
    IdentityChain, IdentityError, KeyExchangeError, KeyExchangeMaterial, NodeAnnouncement,
};
use lanyard_proto::{KeyExchange, NodeInfo};

/// Wire form of a local announcement.
pub(crate) fn node_info(announcement: &NodeAnnouncement) -> NodeInfo {
    let chain = announcement.chain();
    NodeInfo {
        root_key: chain.root_key().to_bytes().to_vec(),
        node_key: chain.node_key().to_bytes().to_vec(),
        node_signature: chain.node_signature().to_bytes().to_vec(),
        ephemeral_key: announcement.ephemeral_key().to_bytes().to_vec(),
        ephemeral_signature: announcement.ephemeral_signature().to_bytes().to_vec(),
    }
}

/// Parse and verify a peer's announcement.
pub(crate) fn announcement(node: &NodeInfo) -> Result<NodeAnnouncement, IdentityError> {
    let chain = IdentityChain::from_parts(&node.root_key, &node.node_key, &node.node_signature)?;
    NodeAnnouncement::from_parts(chain, &node.ephemeral_key, &node.ephemeral_signature)
}

pub(crate) fn key_exchange(material: KeyExchangeMaterial) -> KeyExchange {
    KeyExchange {
        sender_public: material.sender_public.to_vec(),
        exchange_data: material.exchange_data,
    }
}

pub(crate) fn material(exchange: &KeyExchange) -> Result<KeyExchangeMaterial, KeyExchangeError> {
    KeyExchangeMaterial::from_parts(&exchange.sender_public, &exchange.exchange_data)
}

#[cfg(test)]
mod tests {
    use lanyard_crypto::{EphemeralKeyPair, LocalIdentity};

    use super::*;

    #[test]
    fn announcement_survives_wire_form() {
        let local = LocalIdentity::from_seeds(&[1; 32], &[2; 32]);
        let announced = local.announce(&EphemeralKeyPair::from_secret_bytes([3; 32]));

        let parsed = announcement(&node_info(&announced)).unwrap();
        assert_eq!(parsed, announced);
    }

    #[test]
    fn tampered_node_info_rejected() {
        let local = LocalIdentity::from_seeds(&[1; 32], &[2; 32]);
        let mut info = node_info(&local.announce(&EphemeralKeyPair::from_secret_bytes([3; 32])));
        info.ephemeral_key[0] ^= 0x01;

        assert_eq!(
            announcement(&info),
            Err(IdentityError::InvalidSignature { kind: "ephemeral" })
        );
    }

    #[test]
    fn truncated_key_exchange_rejected() {
        let exchange = KeyExchange { sender_public: vec![1; 32], exchange_data: vec![0; 8] };
        assert!(matches!(material(&exchange), Err(KeyExchangeError::MalformedExchange(_))));
    }
}
