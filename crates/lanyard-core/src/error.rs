//! Error types for the transport state machine.
//!
//! Every fault the transport can hit maps to one [`TransportError`] kind.
//! Lower layers keep their own error types (`ProtocolError`, `StreamError`,
//! `IdentityError`, `KeyExchangeError`); the `From` conversions here decide
//! which transport-level kind each of them surfaces as.

use lanyard_crypto::{IdentityError, KeyExchangeError, StreamError};
use lanyard_proto::ProtocolError;
use thiserror::Error;

use crate::transport::TransportStatus;

/// Errors that move a transport into the `Error` status.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Peer's identity differs from the pinned identity
    #[error("peer identity does not match the pinned identity")]
    IdentityMismatch,

    /// Application declined the peer's identity
    #[error("peer identity rejected by the application")]
    IdentityRejected,

    /// Packet or handshake message could not be decoded, or arrived where it
    /// is not legal
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// Key exchange could not be completed (bad public key, wrong ephemeral
    /// key or PSK mismatch)
    #[error("key agreement failed: {0}")]
    KeyAgreementFailure(String),

    /// Payload failed AEAD verification
    #[error("payload authentication failed")]
    AuthenticationFailure,

    /// Payload sequence number is not ahead of the last accepted one
    #[error("sequence regression: last accepted {last}, received {received}")]
    SequenceRegression {
        /// Last accepted sequence number (or generation)
        last: u64,
        /// Rejected sequence number (or generation)
        received: u64,
    },

    /// Operation not valid in the current status
    #[error("invalid state: cannot handle {event} in {status:?}")]
    InvalidState {
        /// Status when the operation was attempted
        status: TransportStatus,
        /// Operation or message that was attempted
        event: &'static str,
    },

    /// A handshake signature did not verify
    #[error("invalid {kind} signature")]
    InvalidSignature {
        /// Which signature failed
        kind: &'static str,
    },

    /// Stream key could not be generated or was unusable
    #[error("invalid stream key: {0}")]
    InvalidStreamKey(String),

    /// Outbound sequence numbers are used up
    #[error("outbound sequence space exhausted")]
    SequenceExhausted,
}

impl TransportError {
    /// Returns true if this error arose from the handshake rather than the
    /// payload phase.
    ///
    /// Handshake faults mean the peer could not be authenticated or keyed;
    /// payload faults mean an authenticated channel saw bad traffic.
    pub fn is_handshake_fault(&self) -> bool {
        match self {
            Self::IdentityMismatch
            | Self::IdentityRejected
            | Self::KeyAgreementFailure(_)
            | Self::InvalidSignature { .. }
            | Self::InvalidStreamKey(_) => true,

            Self::MalformedMessage(_)
            | Self::AuthenticationFailure
            | Self::SequenceRegression { .. }
            | Self::InvalidState { .. }
            | Self::SequenceExhausted => false,
        }
    }
}

impl From<ProtocolError> for TransportError {
    fn from(err: ProtocolError) -> Self {
        Self::MalformedMessage(err.to_string())
    }
}

impl From<IdentityError> for TransportError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidKey { .. } => Self::MalformedMessage(err.to_string()),
            IdentityError::InvalidSignature { kind } => Self::InvalidSignature { kind },
        }
    }
}

impl From<KeyExchangeError> for TransportError {
    fn from(err: KeyExchangeError) -> Self {
        match err {
            KeyExchangeError::Encoding(reason) => Self::InvalidStreamKey(reason),
            KeyExchangeError::InvalidPublicKey(_)
            | KeyExchangeError::MalformedExchange(_)
            | KeyExchangeError::UnwrapFailed => Self::KeyAgreementFailure(err.to_string()),
        }
    }
}

impl From<StreamError> for TransportError {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::SequenceRegression { current, requested } => {
                Self::SequenceRegression { last: current, received: requested }
            },
            StreamError::AuthenticationFailure => Self::AuthenticationFailure,
            StreamError::SequenceExhausted => Self::SequenceExhausted,
            StreamError::GenerationGapTooLarge { .. } | StreamError::MalformedCiphertext { .. } => {
                Self::MalformedMessage(err.to_string())
            },
            StreamError::WrongDirection { .. } | StreamError::InvalidEvolutionCount { .. } => {
                Self::InvalidStreamKey(err.to_string())
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_errors_are_handshake_faults() {
        assert!(TransportError::IdentityMismatch.is_handshake_fault());
        assert!(TransportError::IdentityRejected.is_handshake_fault());
        assert!(TransportError::InvalidSignature { kind: "handshake" }.is_handshake_fault());
    }

    #[test]
    fn payload_errors_are_not_handshake_faults() {
        assert!(!TransportError::AuthenticationFailure.is_handshake_fault());
        assert!(!TransportError::SequenceRegression { last: 5, received: 5 }.is_handshake_fault());
    }

    #[test]
    fn unwrap_failure_is_key_agreement_failure() {
        let err = TransportError::from(KeyExchangeError::UnwrapFailed);
        assert!(matches!(err, TransportError::KeyAgreementFailure(_)));
    }

    #[test]
    fn stream_errors_map_by_cause() {
        assert_eq!(
            TransportError::from(StreamError::AuthenticationFailure),
            TransportError::AuthenticationFailure
        );
        assert!(matches!(
            TransportError::from(StreamError::InvalidEvolutionCount { count: 1, min: 64, max: 32_768 }),
            TransportError::InvalidStreamKey(_)
        ));
        assert!(matches!(
            TransportError::from(StreamError::MalformedCiphertext { len: 3 }),
            TransportError::MalformedMessage(_)
        ));
    }

    #[test]
    fn protocol_errors_are_malformed_messages() {
        let err = TransportError::from(ProtocolError::InvalidMagic);
        assert!(matches!(err, TransportError::MalformedMessage(_)));
    }

    #[test]
    fn error_display() {
        let err = TransportError::InvalidState { status: TransportStatus::None, event: "finish" };
        assert_eq!(err.to_string(), "invalid state: cannot handle finish in None");
    }
}
