//! Fuzz target for the transport receive path
//!
//! Feeds arbitrary packets to transports in every reachable status.
//!
//! # Invariants
//!
//! - `process_rx_buffer` never panics
//! - A transport in `Error` stays in `Error` and emits nothing
//! - Garbage never delivers a payload

#![no_main]

use std::cell::Cell;

use arbitrary::Arbitrary;
use lanyard_core::{
    Environment, TransportCallbacks, TransportConfig, TransportContext, TransportStatus,
};
use lanyard_crypto::{IdentityChain, LocalIdentity};
use libfuzzer_sys::fuzz_target;

struct CounterEnv(Cell<u8>);

impl Environment for CounterEnv {
    fn random_bytes(&self, buffer: &mut [u8]) {
        for byte in buffer {
            let next = self.0.get().wrapping_mul(31).wrapping_add(17);
            self.0.set(next);
            *byte = next;
        }
    }
}

#[derive(Default)]
struct Sink {
    sent: usize,
    delivered: usize,
}

impl TransportCallbacks for Sink {
    fn tx(&mut self, _packet: &[u8]) {
        self.sent += 1;
    }

    fn rx(&mut self, _payload: &[u8]) {
        self.delivered += 1;
    }

    fn on_identity_verify(&mut self, _identity: &IdentityChain) -> bool {
        true
    }
}

#[derive(Debug, Arbitrary)]
struct Scenario {
    start_first: bool,
    packets: Vec<Vec<u8>>,
}

fuzz_target!(|scenario: Scenario| {
    let mut transport = TransportContext::with_env(
        LocalIdentity::from_seeds(&[1; 32], &[2; 32]),
        None,
        TransportConfig::default(),
        Sink::default(),
        CounterEnv(Cell::new(3)),
    );

    if scenario.start_first {
        transport.start();
    }

    for packet in scenario.packets.iter().take(16) {
        let was_error = transport.status() == TransportStatus::Error;
        let sent = transport.callbacks().sent;

        transport.process_rx_buffer(packet);

        if was_error {
            assert_eq!(transport.status(), TransportStatus::Error);
            assert_eq!(transport.callbacks().sent, sent);
        }
        assert_eq!(transport.callbacks().delivered, 0);
    }
});
