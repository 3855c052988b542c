//! Reference-counted stream handle.
//!
//! A [`Stream`] may be retained by the application beyond the lifetime of the
//! transport that created it. Cloning takes another reference; the ratchet
//! and its key material are released (and zeroized) when the last handle is
//! dropped. [`Stream::duplicate`] makes an independent copy instead.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{
    cipher::{CipherResult, Direction, StreamCipher},
    iv::NONCE_RANDOM_SIZE,
    key::StreamKey,
};
use crate::error::StreamError;

/// Shared handle to a [`StreamCipher`].
#[derive(Clone)]
pub struct Stream {
    inner: Arc<Mutex<StreamCipher>>,
}

impl Stream {
    /// Create a stream at generation 0 from an initial key.
    pub fn new(key: StreamKey, direction: Direction) -> Self {
        Self { inner: Arc::new(Mutex::new(StreamCipher::new(key, direction))) }
    }

    // A panic while holding the lock cannot leave the cipher half-committed:
    // state is only written after the AEAD call returns.
    fn lock(&self) -> MutexGuard<'_, StreamCipher> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// See [`StreamCipher::encode`].
    pub fn encode(
        &self,
        data: &[u8],
        aad: &[u8],
        sequence: u64,
        random_suffix: [u8; NONCE_RANDOM_SIZE],
    ) -> Result<CipherResult, StreamError> {
        self.lock().encode(data, aad, sequence, random_suffix)
    }

    /// See [`StreamCipher::decode`].
    pub fn decode(
        &self,
        result: &CipherResult,
        aad: &[u8],
        sequence: u64,
    ) -> Result<Vec<u8>, StreamError> {
        self.lock().decode(result, aad, sequence)
    }

    /// See [`StreamCipher::next_sequence`].
    pub fn next_sequence(&self) -> Result<u64, StreamError> {
        self.lock().next_sequence()
    }

    /// Independent stream starting from this one's current key and position.
    ///
    /// Unlike `clone()`, operations on the copy do not affect the original.
    pub fn duplicate(&self) -> Self {
        let cipher = self.lock().clone();
        Self { inner: Arc::new(Mutex::new(cipher)) }
    }

    /// Number of live handles to this stream.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Returns true if both handles refer to the same stream.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Direction the stream was created with.
    pub fn direction(&self) -> Direction {
        self.lock().direction()
    }

    /// Current key generation.
    pub fn generation(&self) -> u64 {
        self.lock().generation()
    }

    /// Sequence number of the last successful operation.
    pub fn last_sequence(&self) -> u64 {
        self.lock().last_sequence()
    }

    /// Evolution interval of the underlying key.
    pub fn packets_per_evolution(&self) -> u32 {
        self.lock().key().packets_per_evolution()
    }

    /// Copy of the application data attached to the key.
    pub fn user_data(&self) -> Option<Vec<u8>> {
        self.lock().key().user_data().map(<[u8]>::to_vec)
    }
}

impl std::fmt::Debug for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cipher = self.lock();
        f.debug_struct("Stream")
            .field("direction", &cipher.direction())
            .field("generation", &cipher.generation())
            .field("last_sequence", &cipher.last_sequence())
            .finish_non_exhaustive()
    }
}
