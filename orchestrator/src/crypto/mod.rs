//! Cryptographic primitives for the orchestrator.
//!
//! Three concerns live here, and only three:
//!
//! - **encryption** — AES-256-GCM sealing/opening of deep-link payloads.
//! - **handshake** — single-use X25519 key agreement and the round-trip
//!   payload codec.
//! - **keys** — Ed25519 account keypairs, including the pasted
//!   byte-array format the raw-key backend accepts.
//!
//! Don't roll your own. Everything else in the crate goes through these.

pub mod encryption;
pub mod handshake;
pub mod keys;

pub use encryption::{open, seal, EncryptionError};
pub use handshake::{EphemeralHandshake, HandshakeError, RoundTripPayload};
pub use keys::{AccountKeypair, KeyFormatError};
