//! # Account Keys
//!
//! Ed25519 keypairs for Helio accounts, including the pasted byte-array
//! format the raw-key backend accepts from users.
//!
//! ## The pasted format
//!
//! Wallets export secret keys as a JSON array of 64 bytes: the 32-byte seed
//! followed by the 32-byte public key. We parse exactly that -- and we
//! verify the public half actually matches the key derived from the seed,
//! because a truncated or hand-edited paste that still happens to be 64
//! bytes should not silently produce a different account.
//!
//! ## Security considerations
//!
//! - Secret keys are never logged. If you add logging to this module,
//!   you will be asked to leave.
//! - `AccountKeypair` intentionally does NOT implement `Serialize`.
//!   Exporting key material is a deliberate act, not a serde side effect.

use ed25519_dalek::{Signer, SigningKey};
use std::fmt;
use thiserror::Error;

use crate::config::{SECRET_KEY_ARRAY_LENGTH, SIGNING_KEY_LENGTH};
use crate::ledger::Address;

/// Errors produced when parsing user-supplied key material.
///
/// The messages are shown to end users verbatim, so they say what the
/// expected format *is* rather than what went wrong internally.
#[derive(Debug, Error)]
pub enum KeyFormatError {
    #[error("secret key must be a JSON array of bytes, like [12,34,56,...]")]
    NotAByteArray,

    #[error("secret key must be exactly {SECRET_KEY_ARRAY_LENGTH} bytes, got {0}")]
    WrongLength(usize),

    #[error("secret key is internally inconsistent -- the public half does not match the seed")]
    PublicKeyMismatch,
}

/// An Ed25519 keypair controlling a Helio account.
///
/// This is the signing handle for the raw-key backend: the one case where
/// the authority to spend lives in this process, with no second party
/// approving anything.
pub struct AccountKeypair {
    signing_key: SigningKey,
}

impl AccountKeypair {
    /// Generate a fresh keypair using the OS cryptographic RNG.
    ///
    /// Used by tests and by the CLI's demo ledger seeding. Real users bring
    /// their own keys.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut rand::rngs::OsRng);
        Self { signing_key }
    }

    /// Construct a keypair deterministically from a 32-byte seed.
    pub fn from_seed(seed: &[u8; SIGNING_KEY_LENGTH]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Parse the pasted format: a JSON array of exactly 64 bytes,
    /// seed followed by public key.
    ///
    /// Every failure mode maps to a [`KeyFormatError`] the UI can show
    /// as-is. No partial successes: either the paste is a usable keypair
    /// or nothing happened.
    pub fn parse_pasted(input: &str) -> Result<Self, KeyFormatError> {
        let bytes: Vec<u8> =
            serde_json::from_str(input.trim()).map_err(|_| KeyFormatError::NotAByteArray)?;

        if bytes.len() != SECRET_KEY_ARRAY_LENGTH {
            return Err(KeyFormatError::WrongLength(bytes.len()));
        }

        let mut seed = [0u8; SIGNING_KEY_LENGTH];
        seed.copy_from_slice(&bytes[..SIGNING_KEY_LENGTH]);
        let keypair = Self::from_seed(&seed);

        // The trailing 32 bytes are the public key the exporting wallet
        // believed in. If it disagrees with what the seed derives, the
        // paste is corrupt.
        if keypair.signing_key.verifying_key().as_bytes() != &bytes[SIGNING_KEY_LENGTH..] {
            return Err(KeyFormatError::PublicKeyMismatch);
        }

        Ok(keypair)
    }

    /// The account address: the base58-encoded Ed25519 public key.
    pub fn address(&self) -> Address {
        Address::from_bytes(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message. Ed25519 is deterministic -- same key, same message,
    /// same signature, no RNG involved at signing time.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }

    /// Export the 64-byte pasted format. The inverse of [`parse_pasted`],
    /// minus the JSON. Handle with the care key material deserves.
    pub fn to_secret_array(&self) -> [u8; SECRET_KEY_ARRAY_LENGTH] {
        let mut out = [0u8; SECRET_KEY_ARRAY_LENGTH];
        out[..SIGNING_KEY_LENGTH].copy_from_slice(&self.signing_key.to_bytes());
        out[SIGNING_KEY_LENGTH..].copy_from_slice(self.signing_key.verifying_key().as_bytes());
        out
    }
}

impl Clone for AccountKeypair {
    fn clone(&self) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&self.signing_key.to_bytes()),
        }
    }
}

impl fmt::Debug for AccountKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print secret key material in debug output. Not even partially.
        write!(f, "AccountKeypair({})", self.address())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pasted_json(kp: &AccountKeypair) -> String {
        serde_json::to_string(&kp.to_secret_array().to_vec()).unwrap()
    }

    #[test]
    fn parse_pasted_roundtrip() {
        let kp = AccountKeypair::generate();
        let parsed = AccountKeypair::parse_pasted(&pasted_json(&kp)).unwrap();
        assert_eq!(parsed.address(), kp.address());
    }

    #[test]
    fn parse_pasted_tolerates_whitespace() {
        let kp = AccountKeypair::generate();
        let padded = format!("  {}\n", pasted_json(&kp));
        assert!(AccountKeypair::parse_pasted(&padded).is_ok());
    }

    #[test]
    fn too_short_array_is_a_format_error() {
        // "[1,2,3]" is far too short to be key material.
        assert!(matches!(
            AccountKeypair::parse_pasted("[1,2,3]"),
            Err(KeyFormatError::WrongLength(3))
        ));
    }

    #[test]
    fn non_array_input_is_a_format_error() {
        assert!(matches!(
            AccountKeypair::parse_pasted("definitely not a key"),
            Err(KeyFormatError::NotAByteArray)
        ));
        assert!(matches!(
            AccountKeypair::parse_pasted("{\"key\": 1}"),
            Err(KeyFormatError::NotAByteArray)
        ));
    }

    #[test]
    fn mismatched_public_half_rejected() {
        let kp = AccountKeypair::generate();
        let mut bytes = kp.to_secret_array().to_vec();
        // Corrupt one byte of the public half. Still 64 bytes, still a valid
        // JSON array, no longer a coherent keypair.
        bytes[SIGNING_KEY_LENGTH] ^= 0xFF;
        let input = serde_json::to_string(&bytes).unwrap();
        assert!(matches!(
            AccountKeypair::parse_pasted(&input),
            Err(KeyFormatError::PublicKeyMismatch)
        ));
    }

    #[test]
    fn deterministic_from_seed() {
        let seed = [42u8; 32];
        let kp1 = AccountKeypair::from_seed(&seed);
        let kp2 = AccountKeypair::from_seed(&seed);
        assert_eq!(kp1.address(), kp2.address());
    }

    #[test]
    fn signatures_verify_under_the_address_key() {
        use ed25519_dalek::{Signature, Verifier, VerifyingKey};

        let kp = AccountKeypair::generate();
        let msg = b"sweep 50000 lux";
        let sig = kp.sign(msg);

        let vk = VerifyingKey::from_bytes(kp.address().as_bytes()).unwrap();
        assert!(vk.verify(msg, &Signature::from_bytes(&sig)).is_ok());
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let kp = AccountKeypair::generate();
        let debug_str = format!("{:?}", kp);
        assert!(debug_str.starts_with("AccountKeypair("));
        assert!(!debug_str.contains("signing_key"));
    }
}
