//! # AES-256-GCM Sealing
//!
//! Authenticated encryption for deep-link round-trip payloads.
//!
//! We use AES-256-GCM because it's an AEAD cipher — authentication and
//! encryption in one operation, no "encrypt-then-MAC" debates — and because
//! hardware acceleration makes it essentially free on every platform that
//! can run a browser.
//!
//! ## Nonce handling
//!
//! GCM is notoriously unforgiving about nonce reuse. Our nonces are random
//! 96-bit values from the OS CSPRNG, and every key here is a single-use
//! session key derived from an ephemeral handshake, so the birthday bound is
//! not even close to a concern.
//!
//! Unlike a self-contained `nonce || ciphertext` wire format, the nonce is
//! returned and accepted **separately**: on the wire it travels as its own
//! `nonce` query parameter next to `data`, because that is the contract the
//! mobile wallet speaks. Don't concatenate them and hope.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use thiserror::Error;

use crate::config::{AES_KEY_LENGTH, AES_NONCE_LENGTH};

/// Errors that can occur during sealing/opening.
///
/// We intentionally keep these vague. The difference between "wrong key"
/// and "corrupted ciphertext" is none of an attacker's business.
#[derive(Debug, Error)]
pub enum EncryptionError {
    #[error("sealing failed")]
    SealFailed,

    #[error("opening failed -- wrong key or corrupted payload")]
    OpenFailed,

    #[error("invalid nonce length: expected {AES_NONCE_LENGTH} bytes")]
    InvalidNonceLength,
}

/// Seal a plaintext under a 256-bit session key with a fresh random nonce.
///
/// Returns `(nonce, ciphertext)`. The ciphertext includes the 16-byte GCM
/// authentication tag; the nonce must be transmitted alongside it (for the
/// deep-link flow, as the `nonce` query parameter).
pub fn seal(
    key: &[u8; AES_KEY_LENGTH],
    plaintext: &[u8],
) -> Result<([u8; AES_NONCE_LENGTH], Vec<u8>), EncryptionError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| EncryptionError::SealFailed)?;

    let mut nonce_bytes = [0u8; AES_NONCE_LENGTH];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| EncryptionError::SealFailed)?;

    Ok((nonce_bytes, ciphertext))
}

/// Open a payload previously sealed with [`seal`].
///
/// The nonce comes in as a plain slice because it arrives from a URL, not
/// from our own code. Length is checked before anything else.
///
/// # Errors
///
/// Returns `EncryptionError::OpenFailed` if the key is wrong or the
/// ciphertext has been modified in any way. We don't distinguish between
/// those cases on purpose.
pub fn open(
    key: &[u8; AES_KEY_LENGTH],
    nonce: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, EncryptionError> {
    if nonce.len() != AES_NONCE_LENGTH {
        return Err(EncryptionError::InvalidNonceLength);
    }
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| EncryptionError::OpenFailed)?;
    let nonce = Nonce::from_slice(nonce);

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| EncryptionError::OpenFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AES_TAG_LENGTH;

    fn test_key() -> [u8; 32] {
        let mut key = [0u8; 32];
        for (i, byte) in key.iter_mut().enumerate() {
            *byte = i as u8;
        }
        key
    }

    #[test]
    fn seal_open_roundtrip() {
        let key = test_key();
        let plaintext = b"{\"public_key\":\"4Nd1...\"}";

        let (nonce, sealed) = seal(&key, plaintext).unwrap();
        let recovered = open(&key, &nonce, &sealed).unwrap();
        assert_eq!(recovered, plaintext);
    }

    #[test]
    fn wrong_key_fails_deterministically() {
        let key = test_key();
        let (nonce, sealed) = seal(&key, b"secret").unwrap();

        let mut wrong_key = test_key();
        wrong_key[0] ^= 0xFF;

        // Must fail, never silently return garbage.
        assert!(matches!(
            open(&wrong_key, &nonce, &sealed),
            Err(EncryptionError::OpenFailed)
        ));
    }

    #[test]
    fn modified_ciphertext_fails() {
        let key = test_key();
        let (nonce, mut sealed) = seal(&key, b"secret").unwrap();
        sealed[0] ^= 0xFF;
        assert!(open(&key, &nonce, &sealed).is_err());
    }

    #[test]
    fn wrong_nonce_fails() {
        let key = test_key();
        let (_, sealed) = seal(&key, b"secret").unwrap();
        let other_nonce = [0u8; AES_NONCE_LENGTH];
        assert!(open(&key, &other_nonce, &sealed).is_err());
    }

    #[test]
    fn bad_nonce_length_rejected_before_decryption() {
        let key = test_key();
        let (_, sealed) = seal(&key, b"secret").unwrap();
        assert!(matches!(
            open(&key, &[0u8; 4], &sealed),
            Err(EncryptionError::InvalidNonceLength)
        ));
    }

    #[test]
    fn unique_nonces() {
        // Two seals under the same key should produce different nonces.
        // If this fails, the RNG is broken and we need to burn everything down.
        let key = test_key();
        let (n1, _) = seal(&key, b"message").unwrap();
        let (n2, _) = seal(&key, b"message").unwrap();
        assert_ne!(n1, n2);
    }

    #[test]
    fn ciphertext_length() {
        let key = test_key();
        let plaintext = b"exactly 26 bytes of input!";
        let (_, sealed) = seal(&key, plaintext).unwrap();
        assert_eq!(sealed.len(), plaintext.len() + AES_TAG_LENGTH);
    }
}
