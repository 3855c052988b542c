//! Secure transport state machine.
//!
//! A [`TransportContext`] turns an unauthenticated byte pipe into a mutually
//! authenticated, encrypted bidirectional stream. It performs no I/O: bytes
//! for the peer leave through [`TransportCallbacks::tx`], decrypted payloads
//! through [`TransportCallbacks::rx`], and the caller feeds every inbound
//! packet to [`TransportContext::process_rx_buffer`].
//!
//! # State Machine
//!
//! ```text
//!            start()            rx Seed             rx Response / Finish
//! ┌──────┐ ─────────> ┌────────┐ ──────> ┌────────┐ ───────────────> ┌────────┐
//! │ None │            │ Seeded │         │ TxInit │                  │ Active │
//! └──────┘ ──────────────────────────────>└────────┘ <─────────────── └────────┘
//!              rx Seed                                rx Seed (rekey)
//!
//! Seeded ── rx Response ──> Active        Active ── start() ──> Seeded
//! any ── fault ──> Error                  Error ── start() ──> Seeded
//! ```
//!
//! Initiator: `start` emits `Seed`; the `Response` carries the responder's
//! tx key and announcement; the initiator answers with `Finish` carrying its
//! own tx key. Responder: a `Seed` is answered with `Response`; `Finish`
//! completes the exchange.
//!
//! # Invariants
//!
//! - Every status change goes through one transition function that checks
//!   the `(status, event)` pair against the table above
//! - `on_state` fires after every status change, including into `Error`
//! - `Error` is inert: `process_*` do nothing until `start` begins a fresh
//!   handshake
//! - Protocol faults never surface as return values; they are recorded in
//!   [`TransportContext::last_error`] and reported through `on_state`

use lanyard_crypto::{
    CipherResult, Direction, EphemeralKeyPair, IdentityChain, KeyExchangeMaterial, LocalIdentity,
    NodeAnnouncement, Stream, X25519_KEY_SIZE,
};
use lanyard_proto::{
    BodyType, Finish, Handshake, HandshakeEnvelope, HandshakePayload, KeyExchange, NodeInfo,
    Packet, PacketHeader, Response, Seed,
};
use zeroize::Zeroizing;

use crate::{
    callbacks::TransportCallbacks,
    config::{DataFlow, TransportConfig},
    env::{Environment, SystemEnv},
    error::TransportError,
    wire,
};

/// Transport status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportStatus {
    /// Created, no handshake traffic yet
    None,
    /// Seed sent, waiting for the peer's Response
    Seeded,
    /// Response sent, waiting for the peer's Finish (or Response)
    TxInit,
    /// Both directions keyed; payloads flow
    Active,
    /// A fault occurred; only `start` leaves this status
    Error,
}

/// Inputs that drive status changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Start,
    Seed,
    Response,
    Finish,
    Fault,
}

impl Event {
    fn name(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Seed => "seed",
            Self::Response => "response",
            Self::Finish => "finish",
            Self::Fault => "fault",
        }
    }
}

/// Status reached by applying `event` in `status`, or `None` if illegal.
fn next_status(status: TransportStatus, event: Event) -> Option<TransportStatus> {
    use TransportStatus::{Active, Error, None, Seeded, TxInit};

    match (status, event) {
        (None | Active | Error, Event::Start) => Some(Seeded),
        (None | Seeded | Active, Event::Seed) => Some(TxInit),
        (Seeded | TxInit, Event::Response) | (TxInit, Event::Finish) => Some(Active),
        (_, Event::Fault) => Some(Error),
        _ => Option::None,
    }
}

/// Per-handshake secrets and peer data, dropped once the handshake ends.
#[derive(Clone, Default)]
struct HandshakeScratch {
    ephemeral: Option<EphemeralKeyPair>,
    remote: Option<NodeAnnouncement>,
    psk: Option<Zeroizing<Vec<u8>>>,
    psk_resolved: bool,
}

impl HandshakeScratch {
    fn psk(&self) -> Option<&[u8]> {
        self.psk.as_deref().map(Vec::as_slice)
    }
}

/// One end of a secure transport.
///
/// Generic over the application's callbacks `C` (which double as its
/// per-transport context) and the randomness source `E`.
pub struct TransportContext<C, E = SystemEnv> {
    status: TransportStatus,
    local_identity: LocalIdentity,
    remote_identity: Option<IdentityChain>,
    pinned: bool,
    tx_stream: Option<Stream>,
    rx_stream: Option<Stream>,
    data_flow: DataFlow,
    config: TransportConfig,
    callbacks: C,
    env: E,
    handshake: HandshakeScratch,
    last_error: Option<TransportError>,
}

impl<C: TransportCallbacks> TransportContext<C, SystemEnv> {
    /// Create a transport using the OS random number generator.
    ///
    /// If `remote_identity` is given it is pinned: the peer must present
    /// exactly that root and node key, and `on_identity_verify` is never
    /// called.
    pub fn new(
        local_identity: LocalIdentity,
        remote_identity: Option<IdentityChain>,
        config: TransportConfig,
        callbacks: C,
    ) -> Self {
        Self::with_env(local_identity, remote_identity, config, callbacks, SystemEnv::new())
    }
}

impl<C: TransportCallbacks, E: Environment> TransportContext<C, E> {
    /// Create a transport with an explicit randomness source.
    pub fn with_env(
        local_identity: LocalIdentity,
        remote_identity: Option<IdentityChain>,
        config: TransportConfig,
        callbacks: C,
        env: E,
    ) -> Self {
        Self {
            status: TransportStatus::None,
            local_identity,
            pinned: remote_identity.is_some(),
            remote_identity,
            tx_stream: None,
            rx_stream: None,
            data_flow: config.data_flow,
            config,
            callbacks,
            env,
            handshake: HandshakeScratch::default(),
            last_error: None,
        }
    }

    /// Current status.
    pub fn status(&self) -> TransportStatus {
        self.status
    }

    /// Local node identity.
    pub fn local_identity(&self) -> &LocalIdentity {
        &self.local_identity
    }

    /// Peer identity: the pinned identity, or the last one the application
    /// approved.
    pub fn remote_identity(&self) -> Option<&IdentityChain> {
        self.remote_identity.as_ref()
    }

    /// Returns true if the peer identity was pinned at creation.
    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    /// Outbound stream. Clone the handle to retain it past a rekey.
    pub fn tx_stream(&self) -> Option<&Stream> {
        self.tx_stream.as_ref()
    }

    /// Inbound stream. Clone the handle to retain it past a rekey.
    pub fn rx_stream(&self) -> Option<&Stream> {
        self.rx_stream.as_ref()
    }

    /// Application data the peer attached to its tx stream key.
    pub fn rx_stream_user_data(&self) -> Option<Vec<u8>> {
        self.rx_stream.as_ref().and_then(Stream::user_data)
    }

    /// Pre-shared key supplied for the current handshake, if any.
    pub fn user_psk(&self) -> Option<&[u8]> {
        self.handshake.psk()
    }

    /// Current data-flow mode.
    pub fn data_flow_mode(&self) -> DataFlow {
        self.data_flow
    }

    /// Change which payload directions are processed. Takes effect on the
    /// next call to `process_*`.
    pub fn set_data_flow_mode(&mut self, mode: DataFlow) {
        tracing::debug!(from = ?self.data_flow, to = ?mode, "data flow mode changed");
        self.data_flow = mode;
    }

    /// Configuration the transport was created with.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// The fault that moved the transport into `Error`, if any.
    pub fn last_error(&self) -> Option<&TransportError> {
        self.last_error.as_ref()
    }

    /// Application callbacks (the user context).
    pub fn callbacks(&self) -> &C {
        &self.callbacks
    }

    /// Mutable access to the application callbacks.
    pub fn callbacks_mut(&mut self) -> &mut C {
        &mut self.callbacks
    }

    /// Swap in new callbacks, returning the old ones.
    pub fn replace_callbacks(&mut self, callbacks: C) -> C {
        std::mem::replace(&mut self.callbacks, callbacks)
    }

    /// Begin a handshake by sending a `Seed`.
    ///
    /// Legal in `None`, `Active` (rekey) and `Error` (fresh start). Existing
    /// streams and handshake state are discarded first; handles the
    /// application retained stay usable on their own.
    pub fn start(&mut self) {
        if let Err(error) = self.begin_handshake() {
            self.fail(error);
        }
    }

    /// Encrypt `data` and send it to the peer.
    ///
    /// Outside `Active` this is a fault. In `ReadOnly` mode the data is
    /// dropped.
    pub fn process_tx_buffer(&mut self, data: &[u8]) {
        if self.status == TransportStatus::Error {
            tracing::trace!(len = data.len(), "ignoring tx in error status");
            return;
        }

        if let Err(error) = self.send_payload(data) {
            self.fail(error);
        }
    }

    /// Handle a packet received from the peer.
    pub fn process_rx_buffer(&mut self, packet: &[u8]) {
        if self.status == TransportStatus::Error {
            tracing::trace!(len = packet.len(), "ignoring rx in error status");
            return;
        }

        if let Err(error) = self.receive(packet) {
            self.fail(error);
        }
    }

    fn begin_handshake(&mut self) -> Result<(), TransportError> {
        self.check(Event::Start)?;

        self.tx_stream = None;
        self.rx_stream = None;
        self.handshake = HandshakeScratch::default();
        self.last_error = None;

        let node = self.fresh_announcement();
        self.emit_handshake(HandshakePayload::Seed(Seed { node }))?;
        self.transition(Event::Start)
    }

    fn send_payload(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if self.status != TransportStatus::Active {
            return Err(TransportError::InvalidState { status: self.status, event: "tx" });
        }

        if !self.data_flow.allows_tx() {
            tracing::trace!(len = data.len(), "dropping outbound payload in read-only mode");
            return Ok(());
        }

        let Some(stream) = self.tx_stream.as_ref() else {
            return Err(TransportError::InvalidState { status: self.status, event: "tx" });
        };

        let sequence = stream.next_sequence()?;
        let header = PacketHeader::new(BodyType::Payload, sequence);
        let encoded = stream.encode(data, &header.to_bytes(), sequence, self.env.random_array())?;
        let bytes = Packet::new(header, encoded.to_bytes()).to_vec()?;

        tracing::trace!(seq = sequence, len = data.len(), "payload sent");
        self.callbacks.tx(&bytes);
        Ok(())
    }

    fn receive(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let packet = Packet::decode(bytes)?;

        match packet.header.body_type() {
            BodyType::Handshake => self.receive_handshake(&packet.header, &packet.body),
            BodyType::Payload => self.receive_payload(&packet.header, &packet.body),
        }
    }

    fn receive_payload(&mut self, header: &PacketHeader, body: &[u8]) -> Result<(), TransportError> {
        if self.status != TransportStatus::Active {
            return Err(TransportError::MalformedMessage(format!(
                "payload received in {:?}",
                self.status
            )));
        }

        let sequence = header.sequence();
        if !self.data_flow.allows_rx() {
            tracing::trace!(seq = sequence, "dropping inbound payload in write-only mode");
            return Ok(());
        }

        let Some(stream) = self.rx_stream.as_ref() else {
            return Err(TransportError::InvalidState { status: self.status, event: "payload" });
        };

        let last = stream.last_sequence();
        if sequence <= last {
            return Err(TransportError::SequenceRegression { last, received: sequence });
        }

        let encoded = CipherResult::from_bytes(body)?;
        let plaintext = stream.decode(&encoded, &header.to_bytes(), sequence)?;

        tracing::trace!(seq = sequence, len = plaintext.len(), "payload received");
        self.callbacks.rx(&plaintext);
        Ok(())
    }

    fn receive_handshake(
        &mut self,
        header: &PacketHeader,
        body: &[u8],
    ) -> Result<(), TransportError> {
        let envelope = HandshakeEnvelope::decode(body)?;
        let Handshake { payload, .. } = envelope.handshake()?;
        let signed = HandshakeEnvelope::signed_bytes(header, &envelope.message);

        tracing::debug!(message = payload.name(), status = ?self.status, "handshake received");

        match payload {
            HandshakePayload::Seed(seed) => self.on_seed(&seed, &signed, &envelope.signature),
            HandshakePayload::Response(response) => {
                self.on_response(&response, &signed, &envelope.signature)
            },
            HandshakePayload::Finish(finish) => {
                self.on_finish(&finish, &signed, &envelope.signature)
            },
        }
    }

    fn on_seed(&mut self, seed: &Seed, signed: &[u8], signature: &[u8]) -> Result<(), TransportError> {
        self.check(Event::Seed)?;
        let peer = self.authenticate(&seed.node, signed, signature)?;

        // A seed in Seeded is a simultaneous open: keep the ephemeral key the
        // peer may already be wrapping to. Otherwise this is a new handshake.
        let node = if self.status == TransportStatus::Seeded {
            self.current_announcement()?
        } else {
            self.tx_stream = None;
            self.rx_stream = None;
            self.handshake = HandshakeScratch::default();
            self.fresh_announcement()
        };

        let key_exchange = self.issue_tx_stream(&peer)?;
        self.handshake.remote = Some(peer);

        self.emit_handshake(HandshakePayload::Response(Response {
            key_exchange,
            seed: Seed { node },
        }))?;
        self.transition(Event::Seed)
    }

    fn on_response(
        &mut self,
        response: &Response,
        signed: &[u8],
        signature: &[u8],
    ) -> Result<(), TransportError> {
        self.check(Event::Response)?;
        let peer = self.authenticate(&response.seed.node, signed, signature)?;
        self.open_rx_stream(&response.key_exchange)?;

        if self.tx_stream.is_none() {
            let key_exchange = self.issue_tx_stream(&peer)?;
            self.emit_handshake(HandshakePayload::Finish(Finish { key_exchange }))?;
        }

        self.transition(Event::Response)
    }

    fn on_finish(
        &mut self,
        finish: &Finish,
        signed: &[u8],
        signature: &[u8],
    ) -> Result<(), TransportError> {
        self.check(Event::Finish)?;

        let Some(peer) = self.handshake.remote.as_ref() else {
            return Err(TransportError::InvalidState { status: self.status, event: "finish" });
        };
        peer.chain().verify_handshake(signed, signature)?;

        self.open_rx_stream(&finish.key_exchange)?;
        self.transition(Event::Finish)
    }

    /// Verify a peer announcement and the message signature, then apply the
    /// identity policy.
    fn authenticate(
        &mut self,
        node: &NodeInfo,
        signed: &[u8],
        signature: &[u8],
    ) -> Result<NodeAnnouncement, TransportError> {
        let peer = wire::announcement(node)?;
        peer.chain().verify_handshake(signed, signature)?;

        if self.pinned {
            match &self.remote_identity {
                Some(pinned) if pinned.matches(peer.chain()) => {},
                _ => return Err(TransportError::IdentityMismatch),
            }
        } else if self.callbacks.on_identity_verify(peer.chain()) {
            self.remote_identity = Some(peer.chain().clone());
        } else {
            return Err(TransportError::IdentityRejected);
        }

        Ok(peer)
    }

    /// Generate a tx stream key, wrap it for `peer` and install the tx stream.
    fn issue_tx_stream(&mut self, peer: &NodeAnnouncement) -> Result<KeyExchange, TransportError> {
        let random = Zeroizing::new(self.env.random_array::<64>());
        let key = self.config.stream_key(&random)?;
        let key = self.callbacks.on_tx_stream_gen(key);

        self.resolve_psk();
        let sender_secret = Zeroizing::new(self.env.random_array::<X25519_KEY_SIZE>());
        let material = KeyExchangeMaterial::seal(
            &key,
            peer.ephemeral_key(),
            *sender_secret,
            self.env.random_array(),
            self.handshake.psk(),
        )?;

        self.tx_stream = Some(Stream::new(key, Direction::Encode));
        Ok(wire::key_exchange(material))
    }

    fn open_rx_stream(&mut self, exchange: &KeyExchange) -> Result<(), TransportError> {
        let material = wire::material(exchange)?;
        self.resolve_psk();

        let Some(ephemeral) = self.handshake.ephemeral.as_ref() else {
            return Err(TransportError::InvalidState { status: self.status, event: "key exchange" });
        };
        let key = material.open(ephemeral, self.handshake.psk())?;

        self.rx_stream = Some(Stream::new(key, Direction::Decode));
        Ok(())
    }

    /// Ask the application for a PSK once per handshake.
    fn resolve_psk(&mut self) {
        if self.handshake.psk_resolved {
            return;
        }

        self.handshake.psk_resolved = true;
        self.handshake.psk =
            self.callbacks.on_psk_required().filter(|psk| !psk.is_empty()).map(Zeroizing::new);
    }

    /// Create a new ephemeral key and announce it.
    fn fresh_announcement(&mut self) -> NodeInfo {
        let secret = Zeroizing::new(self.env.random_array::<X25519_KEY_SIZE>());
        let ephemeral = EphemeralKeyPair::from_secret_bytes(*secret);
        let node = wire::node_info(&self.local_identity.announce(&ephemeral));
        self.handshake.ephemeral = Some(ephemeral);
        node
    }

    fn current_announcement(&self) -> Result<NodeInfo, TransportError> {
        let Some(ephemeral) = self.handshake.ephemeral.as_ref() else {
            return Err(TransportError::InvalidState { status: self.status, event: "seed" });
        };
        Ok(wire::node_info(&self.local_identity.announce(ephemeral)))
    }

    fn emit_handshake(&mut self, payload: HandshakePayload) -> Result<(), TransportError> {
        let name = payload.name();
        let message = Handshake::new(payload).encode()?;
        let signed = HandshakeEnvelope::signed_bytes(&PacketHeader::handshake(), &message);
        let signature = self.local_identity.sign_handshake(&signed).to_bytes().to_vec();

        let bytes = HandshakeEnvelope { message, signature }.into_packet()?.to_vec()?;

        tracing::debug!(message = name, len = bytes.len(), "handshake sent");
        self.callbacks.tx(&bytes);
        Ok(())
    }

    fn check(&self, event: Event) -> Result<TransportStatus, TransportError> {
        next_status(self.status, event)
            .ok_or(TransportError::InvalidState { status: self.status, event: event.name() })
    }

    /// Apply `event` to the status. The only place the status is written.
    fn transition(&mut self, event: Event) -> Result<(), TransportError> {
        let to = self.check(event)?;
        let from = self.status;
        self.status = to;

        if matches!(to, TransportStatus::Active | TransportStatus::Error) {
            // Ephemeral secrets are not needed once the handshake is over
            self.handshake.ephemeral = None;
            self.handshake.remote = None;
        }

        tracing::debug!(?from, ?to, event = event.name(), "transport status changed");
        self.callbacks.on_state(to);
        Ok(())
    }

    fn fail(&mut self, error: TransportError) {
        tracing::warn!(status = ?self.status, %error, "transport fault");
        self.last_error = Some(error);

        let Ok(()) = self.transition(Event::Fault) else {
            unreachable!("fault is legal from every status");
        };
    }
}

/// Deep copy: the clone gets its own tx and rx ratchets, positioned where the
/// original's are. Stream handles the application retained keep pointing at
/// the original's ratchets.
impl<C: Clone, E: Clone> Clone for TransportContext<C, E> {
    fn clone(&self) -> Self {
        Self {
            status: self.status,
            local_identity: self.local_identity.clone(),
            remote_identity: self.remote_identity.clone(),
            pinned: self.pinned,
            tx_stream: self.tx_stream.as_ref().map(Stream::duplicate),
            rx_stream: self.rx_stream.as_ref().map(Stream::duplicate),
            data_flow: self.data_flow,
            config: self.config.clone(),
            callbacks: self.callbacks.clone(),
            env: self.env.clone(),
            handshake: self.handshake.clone(),
            last_error: self.last_error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    /// Deterministic, non-repeating byte source.
    struct CounterEnv {
        counter: Cell<u8>,
    }

    impl CounterEnv {
        fn new(start: u8) -> Self {
            Self { counter: Cell::new(start) }
        }
    }

    impl Environment for CounterEnv {
        fn random_bytes(&self, buffer: &mut [u8]) {
            for byte in buffer.iter_mut() {
                let next = self.counter.get().wrapping_mul(31).wrapping_add(17);
                self.counter.set(next);
                *byte = next;
            }
        }
    }

    #[derive(Default)]
    struct Recorder {
        sent: Vec<Vec<u8>>,
        received: Vec<Vec<u8>>,
        states: Vec<TransportStatus>,
    }

    impl TransportCallbacks for Recorder {
        fn tx(&mut self, packet: &[u8]) {
            self.sent.push(packet.to_vec());
        }

        fn rx(&mut self, payload: &[u8]) {
            self.received.push(payload.to_vec());
        }

        fn on_state(&mut self, status: TransportStatus) {
            self.states.push(status);
        }
    }

    fn transport() -> TransportContext<Recorder, CounterEnv> {
        TransportContext::with_env(
            LocalIdentity::from_seeds(&[1; 32], &[2; 32]),
            None,
            TransportConfig::default(),
            Recorder::default(),
            CounterEnv::new(5),
        )
    }

    #[test]
    fn transition_table() {
        use TransportStatus::{Active, Error, None, Seeded, TxInit};

        assert_eq!(next_status(None, Event::Start), Some(Seeded));
        assert_eq!(next_status(Active, Event::Start), Some(Seeded));
        assert_eq!(next_status(Error, Event::Start), Some(Seeded));
        assert_eq!(next_status(Seeded, Event::Start), Option::None);
        assert_eq!(next_status(TxInit, Event::Start), Option::None);

        assert_eq!(next_status(Active, Event::Seed), Some(TxInit));
        assert_eq!(next_status(TxInit, Event::Seed), Option::None);
        assert_eq!(next_status(Seeded, Event::Response), Some(Active));
        assert_eq!(next_status(None, Event::Response), Option::None);
        assert_eq!(next_status(TxInit, Event::Finish), Some(Active));
        assert_eq!(next_status(Seeded, Event::Finish), Option::None);

        for status in [None, Seeded, TxInit, Active, Error] {
            assert_eq!(next_status(status, Event::Fault), Some(Error));
        }
    }

    #[test]
    fn new_transport_is_idle() {
        let transport = transport();
        assert_eq!(transport.status(), TransportStatus::None);
        assert!(transport.tx_stream().is_none());
        assert!(transport.rx_stream().is_none());
        assert!(!transport.is_pinned());
        assert!(transport.callbacks().sent.is_empty());
    }

    #[test]
    fn start_emits_signed_seed() {
        let mut transport = transport();
        transport.start();

        assert_eq!(transport.status(), TransportStatus::Seeded);
        assert_eq!(transport.callbacks().states, vec![TransportStatus::Seeded]);
        assert_eq!(transport.callbacks().sent.len(), 1);

        let packet = Packet::decode(&transport.callbacks().sent[0]).unwrap();
        assert_eq!(packet.header.body_type(), BodyType::Handshake);

        let envelope = HandshakeEnvelope::decode(&packet.body).unwrap();
        let HandshakePayload::Seed(seed) = envelope.handshake().unwrap().payload else {
            panic!("expected seed");
        };

        let signed = HandshakeEnvelope::signed_bytes(&packet.header, &envelope.message);
        let peer = wire::announcement(&seed.node).unwrap();
        assert!(peer.chain().verify_handshake(&signed, &envelope.signature).is_ok());
        assert!(peer.chain().matches(transport.local_identity().chain()));
    }

    #[test]
    fn start_twice_is_invalid_state() {
        let mut transport = transport();
        transport.start();
        transport.start();

        assert_eq!(transport.status(), TransportStatus::Error);
        assert_eq!(
            transport.last_error(),
            Some(&TransportError::InvalidState { status: TransportStatus::Seeded, event: "start" })
        );
        assert_eq!(transport.callbacks().sent.len(), 1, "no second seed");
    }

    #[test]
    fn tx_before_active_is_fault() {
        let mut transport = transport();
        transport.process_tx_buffer(b"too early");

        assert_eq!(transport.status(), TransportStatus::Error);
        assert_eq!(transport.callbacks().states, vec![TransportStatus::Error]);
        assert!(transport.callbacks().sent.is_empty());
    }

    #[test]
    fn error_status_is_inert() {
        let mut transport = transport();
        transport.process_rx_buffer(b"garbage");
        assert_eq!(transport.status(), TransportStatus::Error);

        let states_before = transport.callbacks().states.len();
        transport.process_rx_buffer(b"more garbage");
        transport.process_tx_buffer(b"data");

        assert_eq!(transport.callbacks().states.len(), states_before);
        assert!(transport.callbacks().sent.is_empty());
    }

    #[test]
    fn start_recovers_from_error() {
        let mut transport = transport();
        transport.process_rx_buffer(b"garbage");
        assert!(matches!(transport.last_error(), Some(TransportError::MalformedMessage(_))));

        transport.start();
        assert_eq!(transport.status(), TransportStatus::Seeded);
        assert!(transport.last_error().is_none());
    }

    #[test]
    fn payload_before_active_is_malformed() {
        let mut transport = transport();
        transport.start();

        let packet = Packet::payload(1, vec![0u8; 64]).to_vec().unwrap();
        transport.process_rx_buffer(&packet);

        assert_eq!(transport.status(), TransportStatus::Error);
        assert!(matches!(transport.last_error(), Some(TransportError::MalformedMessage(_))));
    }

    #[test]
    fn replace_callbacks_returns_previous() {
        let mut transport = transport();
        transport.start();

        let previous = transport.replace_callbacks(Recorder::default());
        assert_eq!(previous.sent.len(), 1);
        assert!(transport.callbacks().sent.is_empty());
    }

    #[test]
    fn data_flow_mode_is_settable() {
        let mut transport = transport();
        assert_eq!(transport.data_flow_mode(), DataFlow::Bidirectional);

        transport.set_data_flow_mode(DataFlow::ReadOnly);
        assert_eq!(transport.data_flow_mode(), DataFlow::ReadOnly);
    }
}
