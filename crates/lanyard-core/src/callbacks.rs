//! Application callbacks.
//!
//! The transport performs no I/O. Everything it produces or needs from the
//! application goes through [`TransportCallbacks`], whose implementor also
//! serves as the application's per-transport context: any state the
//! callbacks need lives in the implementing type.
//!
//! Callbacks are invoked synchronously from inside `start`,
//! `process_tx_buffer` and `process_rx_buffer`, so a callback observes the
//! transport mid-operation and must not assume the call has completed.

use lanyard_crypto::{IdentityChain, StreamKey};

use crate::transport::TransportStatus;

/// Hooks the transport calls while processing.
pub trait TransportCallbacks {
    /// Deliver bytes that must be sent to the peer.
    fn tx(&mut self, packet: &[u8]);

    /// Deliver a decrypted payload received from the peer.
    fn rx(&mut self, payload: &[u8]);

    /// Observe a status change. Called after the status has changed.
    fn on_state(&mut self, status: TransportStatus) {
        let _ = status;
    }

    /// Decide whether to trust an unpinned peer.
    ///
    /// Never called for a transport with a pinned remote identity. The chain
    /// has already been verified cryptographically; this decides whether it
    /// is the right peer. Rejects by default.
    fn on_identity_verify(&mut self, identity: &IdentityChain) -> bool {
        let _ = identity;
        false
    }

    /// Supply a pre-shared key to mix into the key exchange.
    ///
    /// Called at most once per handshake. `None` or an empty key means no
    /// PSK. Both sides must agree or key agreement fails.
    fn on_psk_required(&mut self) -> Option<Vec<u8>> {
        None
    }

    /// Inspect or replace a freshly generated tx stream key before it is sent
    /// to the peer. Typically used to attach `user_data`.
    fn on_tx_stream_gen(&mut self, key: StreamKey) -> StreamKey {
        key
    }
}
