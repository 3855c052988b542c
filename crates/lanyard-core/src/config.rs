//! Transport configuration.

use lanyard_crypto::{DEFAULT_PACKETS_PER_EVOLUTION, StreamKey};

/// Which directions of payload traffic a transport handles.
///
/// Handshake traffic is unaffected by the mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataFlow {
    /// Encode outbound and decode inbound payloads
    #[default]
    Bidirectional,
    /// Decode inbound payloads; outbound payloads are dropped
    ReadOnly,
    /// Encode outbound payloads; inbound payloads are dropped
    WriteOnly,
}

impl DataFlow {
    /// Returns true if outbound payloads are encoded.
    pub fn allows_tx(self) -> bool {
        matches!(self, Self::Bidirectional | Self::WriteOnly)
    }

    /// Returns true if inbound payloads are decoded.
    pub fn allows_rx(self) -> bool {
        matches!(self, Self::Bidirectional | Self::ReadOnly)
    }
}

/// Transport configuration
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Evolution interval for locally generated tx stream keys.
    ///
    /// Validated when the first key is generated; an out-of-range value fails
    /// the handshake with `InvalidStreamKey`.
    pub packets_per_evolution: u32,
    /// Initial data-flow mode
    pub data_flow: DataFlow,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self { packets_per_evolution: DEFAULT_PACKETS_PER_EVOLUTION, data_flow: DataFlow::default() }
    }
}

impl TransportConfig {
    /// Generate a tx stream key from 64 random bytes under this
    /// configuration.
    pub(crate) fn stream_key(
        &self,
        random: &[u8; 64],
    ) -> Result<StreamKey, lanyard_crypto::StreamError> {
        StreamKey::generate(random, self.packets_per_evolution)
    }
}
