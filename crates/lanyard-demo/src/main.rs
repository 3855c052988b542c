//! Lanyard loopback demo.
//!
//! Runs two transports in one process, wired back to back: handshake,
//! payload exchange in both directions, and an optional rekey.
//!
//! # Usage
//!
//! ```bash
//! lanyard-demo --messages 1000 --packets-per-evolution 64
//! RUST_LOG=lanyard_core=debug lanyard-demo --psk hunter2 --rekey-after 500
//! ```

use std::collections::VecDeque;

use clap::Parser;
use lanyard_core::{
    Environment, SystemEnv, TransportCallbacks, TransportConfig, TransportContext, TransportStatus,
};
use lanyard_crypto::{DEFAULT_PACKETS_PER_EVOLUTION, IdentityChain, LocalIdentity, StreamKey};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Lanyard loopback demo
#[derive(Parser, Debug)]
#[command(name = "lanyard-demo")]
#[command(about = "Handshake and exchange payloads between two local transports")]
#[command(version)]
struct Args {
    /// Number of payloads each side sends
    #[arg(short, long, default_value = "16")]
    messages: usize,

    /// Packets encrypted under each key generation
    #[arg(long, default_value_t = DEFAULT_PACKETS_PER_EVOLUTION)]
    packets_per_evolution: u32,

    /// Pre-shared key mixed into both key exchanges
    #[arg(long)]
    psk: Option<String>,

    /// Rekey after this many payloads from the initiator
    #[arg(long)]
    rekey_after: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// One side of the loopback.
struct Endpoint {
    name: &'static str,
    outbox: VecDeque<Vec<u8>>,
    delivered: usize,
    psk: Option<Vec<u8>>,
}

impl Endpoint {
    fn new(name: &'static str, psk: Option<Vec<u8>>) -> Self {
        Self { name, outbox: VecDeque::new(), delivered: 0, psk }
    }
}

impl TransportCallbacks for Endpoint {
    fn tx(&mut self, packet: &[u8]) {
        self.outbox.push_back(packet.to_vec());
    }

    fn rx(&mut self, payload: &[u8]) {
        self.delivered += 1;
        tracing::debug!(endpoint = self.name, len = payload.len(), "payload delivered");
    }

    fn on_state(&mut self, status: TransportStatus) {
        tracing::info!(endpoint = self.name, ?status, "status");
    }

    fn on_identity_verify(&mut self, identity: &IdentityChain) -> bool {
        tracing::info!(
            endpoint = self.name,
            fingerprint = %short_fingerprint(identity),
            "accepting unpinned peer"
        );
        true
    }

    fn on_psk_required(&mut self) -> Option<Vec<u8>> {
        self.psk.clone()
    }

    fn on_tx_stream_gen(&mut self, key: StreamKey) -> StreamKey {
        key.with_user_data(Some(self.name.as_bytes().to_vec()))
    }
}

type Node = TransportContext<Endpoint>;

/// First 8 fingerprint bytes, hex encoded.
fn short_fingerprint(identity: &IdentityChain) -> String {
    hex::encode(&identity.fingerprint()[..8])
}

fn identity(env: &SystemEnv) -> LocalIdentity {
    LocalIdentity::from_seeds(&env.random_array(), &env.random_array())
}

/// Move every queued packet from `from` to `to`.
fn pump(from: &mut Node, to: &mut Node) -> usize {
    let mut moved = 0;
    while let Some(packet) = from.callbacks_mut().outbox.pop_front() {
        to.process_rx_buffer(&packet);
        moved += 1;
    }
    moved
}

fn settle(a: &mut Node, b: &mut Node) {
    while pump(a, b) + pump(b, a) > 0 {}
}

fn ensure_active(node: &Node) -> Result<(), Box<dyn std::error::Error>> {
    if node.status() == TransportStatus::Active {
        return Ok(());
    }

    match node.last_error() {
        Some(error) => Err(error.clone().into()),
        None => Err(format!("{} stuck in {:?}", node.callbacks().name, node.status()).into()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let env = SystemEnv::new();
    let alice_identity = identity(&env);
    let bob_identity = identity(&env);
    let psk = args.psk.map(String::into_bytes);
    let config = TransportConfig {
        packets_per_evolution: args.packets_per_evolution,
        ..TransportConfig::default()
    };

    // Alice pins Bob; Bob accepts whoever connects
    let bob_chain = bob_identity.chain().clone();
    let mut alice = TransportContext::new(
        alice_identity,
        Some(bob_chain),
        config.clone(),
        Endpoint::new("alice", psk.clone()),
    );
    let mut bob = TransportContext::new(bob_identity, None, config, Endpoint::new("bob", psk));

    alice.start();
    settle(&mut alice, &mut bob);
    ensure_active(&alice)?;
    ensure_active(&bob)?;

    for i in 0..args.messages {
        if args.rekey_after == Some(i) {
            tracing::info!(after = i, "rekeying");
            alice.start();
            settle(&mut alice, &mut bob);
            ensure_active(&alice)?;
            ensure_active(&bob)?;
        }

        let payload = format!("message {i}");
        alice.process_tx_buffer(payload.as_bytes());
        bob.process_tx_buffer(payload.as_bytes());
        settle(&mut alice, &mut bob);
    }

    ensure_active(&alice)?;
    ensure_active(&bob)?;

    let rx_generation = bob.rx_stream().map_or(0, lanyard_crypto::Stream::generation);
    tracing::info!(
        alice_received = alice.callbacks().delivered,
        bob_received = bob.callbacks().delivered,
        bob_rx_generation = rx_generation,
        peer_tag = ?bob.rx_stream_user_data().map(String::from_utf8),
        "done"
    );

    Ok(())
}
