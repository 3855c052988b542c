//! Environment abstraction for deterministic testing.
//!
//! Decouples the transport from the system random number generator. Tests
//! inject a seeded generator and get byte-identical handshakes on every run;
//! production uses [`SystemEnv`].

/// Source of randomness for key generation and nonces.
///
/// # Safety
///
/// Implementations MUST guarantee that `random_bytes()` uses cryptographically
/// secure entropy in production. A predictable source makes every stream key
/// and ephemeral secret predictable.
pub trait Environment {
    /// Fills the provided buffer with random bytes.
    ///
    /// # Invariants
    ///
    /// - Given the same RNG seed, this produces the same sequence of bytes
    /// - Uses cryptographically secure RNG
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Fresh random array of `N` bytes.
    fn random_array<const N: usize>(&self) -> [u8; N] {
        let mut bytes = [0u8; N];
        self.random_bytes(&mut bytes);
        bytes
    }
}

/// Production environment backed by the OS RNG.
///
/// # Panics
///
/// Panics if the OS RNG fails. A transport without functioning cryptographic
/// randomness cannot generate keys safely, and continuing would be worse than
/// aborting.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).expect("invariant: OS RNG failure is unrecoverable");
    }
}
