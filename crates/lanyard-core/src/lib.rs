//! Handshake state machine and secure transport for Lanyard.
//!
//! [`TransportContext`] authenticates two nodes with a three-message
//! handshake (`Seed`, `Response`, `Finish`), derives one stream key per
//! direction, and then encrypts and decrypts payload packets through the
//! key-evolution ratchet from `lanyard-crypto`.
//!
//! # Architecture
//!
//! - Sans-IO: bytes go out through [`TransportCallbacks::tx`] and come in
//!   through [`TransportContext::process_rx_buffer`]; framing and sockets are
//!   the caller's concern
//! - Randomness is injected through [`Environment`], so tests can replay a
//!   handshake byte-for-byte with a seeded generator
//! - Single-threaded: every mutating operation takes `&mut self`
//!
//! # Logging
//!
//! Status transitions are logged at `debug`, faults at `warn` and dropped
//! packets at `trace` via `tracing`. No subscriber is installed here.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod callbacks;
pub mod config;
pub mod env;
pub mod error;
pub mod transport;
mod wire;

pub use callbacks::TransportCallbacks;
pub use config::{DataFlow, TransportConfig};
pub use env::{Environment, SystemEnv};
pub use error::TransportError;
pub use transport::{TransportContext, TransportStatus};
