//! # Ephemeral Handshake
//!
//! Single-use X25519 key agreement for deep-link round trips, plus the
//! structured payload codec the two ends exchange.
//!
//! ## Protocol flow
//!
//! 1. Before navigating away, we generate a fresh X25519 keypair and persist
//!    the secret half (tagged with its purpose) in the session store — the
//!    page context does not survive the navigation.
//! 2. The outbound URL carries our public key. The wallet generates its own
//!    keypair, computes the shared secret, and seals its response.
//! 3. On the next page load, the stored secret plus the wallet's public key
//!    (embedded in the return URL) reproduce the same shared secret, and the
//!    payload opens.
//! 4. The stored secret is erased. One round trip, one key, no exceptions.
//!
//! ## Key derivation
//!
//! The raw Diffie-Hellman output is NOT used directly as an encryption key.
//! That would be a textbook mistake — DH outputs are curve points with
//! algebraic structure, not uniform random bytes. We run the shared secret
//! through BLAKE3's `derive_key` mode with a domain-separation context and
//! both public keys (in canonical order, so either side derives the same
//! key) mixed into the input.
//!
//! ## Why `StaticSecret` and not `EphemeralSecret`
//!
//! x25519-dalek's `EphemeralSecret` enforces single use at the type level,
//! which is lovely — until your "session" spans a page teardown and the
//! secret has to be serialized into storage. `StaticSecret` gives us the
//! byte access; the single-use discipline is enforced one level up by the
//! store slot, which is erased on first consumption.

use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use x25519_dalek::{PublicKey, StaticSecret};

use crate::config::{AES_KEY_LENGTH, HANDSHAKE_KEY_LENGTH};
use crate::crypto::encryption::{self, EncryptionError};

/// Errors in the handshake and payload codec.
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("invalid remote public key: expected {HANDSHAKE_KEY_LENGTH} bytes")]
    InvalidRemoteKey,

    #[error(transparent)]
    Encryption(#[from] EncryptionError),

    #[error("round-trip payload is not valid JSON or has an unknown shape")]
    MalformedPayload,
}

/// One side of a single-use X25519 key agreement.
///
/// Created immediately before any operation that leaves the page. The secret
/// half is what gets persisted across the navigation; everything else is
/// rederivable.
pub struct EphemeralHandshake {
    secret: StaticSecret,
    public: PublicKey,
}

impl EphemeralHandshake {
    /// Generate a fresh ephemeral keypair from the OS CSPRNG.
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Reconstruct a handshake from secret bytes retrieved from the session
    /// store. The public key is rederived; it never needs to be stored.
    pub fn from_secret_bytes(bytes: [u8; HANDSHAKE_KEY_LENGTH]) -> Self {
        let secret = StaticSecret::from(bytes);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// The public key to embed in the outbound deep-link URL.
    pub fn public_key_bytes(&self) -> [u8; HANDSHAKE_KEY_LENGTH] {
        self.public.to_bytes()
    }

    /// The secret bytes to persist before navigating away. Handle like the
    /// key material it is: store it, use it once, erase it.
    pub fn secret_bytes(&self) -> [u8; HANDSHAKE_KEY_LENGTH] {
        self.secret.to_bytes()
    }

    /// Derive the shared AES-256 session key from the remote wallet's public
    /// key. Consumes the handshake -- there is no second exchange.
    ///
    /// The remote key arrives from a URL, so it is a slice; anything that is
    /// not exactly 32 bytes is rejected before touching the curve.
    pub fn derive_shared_key(
        self,
        remote_public: &[u8],
    ) -> Result<[u8; AES_KEY_LENGTH], HandshakeError> {
        let remote: [u8; HANDSHAKE_KEY_LENGTH] = remote_public
            .try_into()
            .map_err(|_| HandshakeError::InvalidRemoteKey)?;
        let remote_pk = PublicKey::from(remote);
        let raw = self.secret.diffie_hellman(&remote_pk);

        Ok(derive_session_key(
            raw.as_bytes(),
            &self.public.to_bytes(),
            &remote,
        ))
    }
}

/// KDF: `BLAKE3-derive-key(context, dh || min(pub_a, pub_b) || max(pub_a, pub_b))`.
///
/// The two public keys are mixed in canonical (lexicographic) order so both
/// ends of the exchange derive the same key regardless of which is "ours".
fn derive_session_key(
    shared_secret: &[u8; 32],
    our_public: &[u8; 32],
    remote_public: &[u8; 32],
) -> [u8; AES_KEY_LENGTH] {
    let mut hasher = blake3::Hasher::new_derive_key("sweep v1 round-trip session key");
    hasher.update(shared_secret);

    let (first, second) = if our_public <= remote_public {
        (our_public, remote_public)
    } else {
        (remote_public, our_public)
    };
    hasher.update(first);
    hasher.update(second);

    let mut session_key = [0u8; AES_KEY_LENGTH];
    hasher.finalize_xof().fill(&mut session_key);
    session_key
}

// ---------------------------------------------------------------------------
// Round-Trip Payload
// ---------------------------------------------------------------------------

/// The structured payload carried by a returning deep link, after the
/// `data` parameter has been opened with the shared session key.
///
/// Transient by design: it exists for the duration of one page load and is
/// never persisted anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoundTripPayload {
    /// The wallet approved a connection and reports the account address.
    Connected {
        /// Base58-encoded Helio account address.
        address: String,
    },
    /// The wallet signed and submitted the transaction.
    Signed {
        /// Transaction id (base58 signature) as reported by the wallet.
        transaction_id: String,
    },
    /// The user declined, or the wallet hit an error on its side.
    Declined {
        /// Human-readable reason from the wallet.
        reason: String,
    },
}

impl RoundTripPayload {
    /// Seal this payload under a derived session key.
    ///
    /// Returns `(nonce, ciphertext)` ready to be base58-encoded into the
    /// `nonce` and `data` parameters. Used by tests and by anything acting
    /// as the wallet side of the exchange.
    pub fn seal(
        &self,
        session_key: &[u8; AES_KEY_LENGTH],
    ) -> Result<([u8; crate::config::AES_NONCE_LENGTH], Vec<u8>), HandshakeError> {
        let json = serde_json::to_vec(self).map_err(|_| HandshakeError::MalformedPayload)?;
        Ok(encryption::seal(session_key, &json)?)
    }

    /// Open and decode a payload from the wire.
    ///
    /// Any failure -- wrong key, tampered ciphertext, valid plaintext that
    /// isn't one of our shapes -- is terminal for the round trip. There is
    /// nothing to retry; the ephemeral key is already gone.
    pub fn open(
        session_key: &[u8; AES_KEY_LENGTH],
        nonce: &[u8],
        data: &[u8],
    ) -> Result<Self, HandshakeError> {
        let plaintext = encryption::open(session_key, nonce, data)?;
        serde_json::from_slice(&plaintext).map_err(|_| HandshakeError::MalformedPayload)
    }
}
