//! # Transfer Construction & Signing
//!
//! Builds the one transaction shape this system ever produces: move the
//! whole spendable balance, minus the reserve, from the session account to
//! the configured destination.
//!
//! Construction and signing are separate on purpose (construction is
//! testable without key material), and the signable byte format is
//! deterministic: fixed-width little-endian integers with null separators,
//! not JSON -- field ordering across serde formats is not a thing you bet
//! a signature on.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::keys::AccountKeypair;
use crate::ledger::{Address, ReferencePoint, TxId};

/// The byte slice on the wire was not a serialized transfer.
#[derive(Debug, Error)]
#[error("malformed transfer bytes")]
pub struct TransferDecodeError;

/// The derived plan for one sweep: everything needed to build the
/// transaction, computed fresh from a balance read.
///
/// A plan is derived, never stored, and only ever constructed with a
/// positive amount -- `balance <= reserve` is rejected upstream as an
/// error, not encoded as a zero-amount plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPlan {
    pub from: Address,
    pub to: Address,
    /// Exactly `balance - reserve` at planning time, in lux.
    pub amount_lux: u64,
    /// Recent checkpoint anchoring the validity window.
    pub reference_point: ReferencePoint,
}

/// The transfer instruction as serialized into transaction bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferInstruction {
    pub from: Address,
    pub to: Address,
    pub amount_lux: u64,
    pub reference_point: ReferencePoint,
}

/// An unsigned transfer, fresh from a plan.
///
/// For the injected and raw-key backends this is signed in-process; for the
/// deep-link backend its serialized bytes ride the outbound URL's
/// `transaction` parameter and come back signed by the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTransfer {
    pub instruction: TransferInstruction,
}

impl UnsignedTransfer {
    pub fn from_plan(plan: &TransferPlan) -> Self {
        Self {
            instruction: TransferInstruction {
                from: plan.from,
                to: plan.to,
                amount_lux: plan.amount_lux,
                reference_point: plan.reference_point.clone(),
            },
        }
    }

    /// Canonical bytes covered by the signature.
    ///
    /// Layout: `from || 0x00 || to || 0x00 || amount_le || ref_len_le || ref`.
    /// Fixed-width integers, explicit separators, no serde involved.
    pub fn signable_bytes(&self) -> Vec<u8> {
        let ins = &self.instruction;
        let mut buf = Vec::with_capacity(96 + ins.reference_point.0.len());

        buf.extend_from_slice(ins.from.as_bytes());
        buf.push(0x00);
        buf.extend_from_slice(ins.to.as_bytes());
        buf.push(0x00);
        buf.extend_from_slice(&ins.amount_lux.to_le_bytes());
        buf.extend_from_slice(&(ins.reference_point.0.len() as u32).to_le_bytes());
        buf.extend_from_slice(ins.reference_point.0.as_bytes());

        buf
    }

    /// Sign with the sender's keypair.
    pub fn sign(self, keypair: &AccountKeypair) -> SignedTransfer {
        let signature = keypair.sign(&self.signable_bytes());
        SignedTransfer {
            instruction: self.instruction,
            signer: *keypair.address().as_bytes(),
            signature: signature.to_vec(),
        }
    }

    /// Wire bytes for the deep-link `transaction` parameter.
    pub fn to_bytes(&self) -> Vec<u8> {
        // Serialization of a struct of plain fields cannot fail.
        bincode::serialize(self).expect("unsigned transfer serialization")
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransferDecodeError> {
        bincode::deserialize(bytes).map_err(|_| TransferDecodeError)
    }
}

/// A signed transfer, ready for submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransfer {
    pub instruction: TransferInstruction,
    /// Ed25519 public key of the signer. Must equal `instruction.from`.
    signer: [u8; 32],
    /// Ed25519 signature over the unsigned transfer's signable bytes.
    /// Stored as `Vec<u8>` for serde compatibility, always 64 bytes.
    signature: Vec<u8>,
}

impl SignedTransfer {
    /// Verify the signature, including that the signer *is* the debited
    /// account. A valid signature from the wrong key moves nobody's money.
    pub fn verify(&self) -> bool {
        if self.signer != *self.instruction.from.as_bytes() {
            return false;
        }
        let Ok(vk) = VerifyingKey::from_bytes(&self.signer) else {
            return false;
        };
        let sig_bytes: [u8; 64] = match self.signature.as_slice().try_into() {
            Ok(b) => b,
            Err(_) => return false,
        };
        let unsigned = UnsignedTransfer {
            instruction: self.instruction.clone(),
        };
        vk.verify(&unsigned.signable_bytes(), &Signature::from_bytes(&sig_bytes))
            .is_ok()
    }

    /// The transaction id: the base58-encoded signature, which is how the
    /// network names transactions.
    pub fn tx_id(&self) -> TxId {
        TxId(bs58::encode(&self.signature).into_string())
    }

    /// Raw bytes for [`LedgerClient::submit`].
    ///
    /// [`LedgerClient::submit`]: crate::ledger::LedgerClient::submit
    pub fn to_bytes(&self) -> Vec<u8> {
        bincode::serialize(self).expect("signed transfer serialization")
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransferDecodeError> {
        bincode::deserialize(bytes).map_err(|_| TransferDecodeError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_plan(from: &AccountKeypair) -> TransferPlan {
        TransferPlan {
            from: from.address(),
            to: Address::from_bytes([3u8; 32]),
            amount_lux: 50_000,
            reference_point: ReferencePoint("ref-7".to_string()),
        }
    }

    #[test]
    fn signable_bytes_are_deterministic() {
        let kp = AccountKeypair::from_seed(&[1u8; 32]);
        let plan = sample_plan(&kp);
        let a = UnsignedTransfer::from_plan(&plan).signable_bytes();
        let b = UnsignedTransfer::from_plan(&plan).signable_bytes();
        assert_eq!(a, b);
    }

    #[test]
    fn amount_affects_signable_bytes() {
        let kp = AccountKeypair::from_seed(&[1u8; 32]);
        let mut plan = sample_plan(&kp);
        let a = UnsignedTransfer::from_plan(&plan).signable_bytes();
        plan.amount_lux += 1;
        let b = UnsignedTransfer::from_plan(&plan).signable_bytes();
        assert_ne!(a, b);
    }

    #[test]
    fn sign_verify_roundtrip() {
        let kp = AccountKeypair::generate();
        let signed = UnsignedTransfer::from_plan(&sample_plan(&kp)).sign(&kp);
        assert!(signed.verify());
    }

    #[test]
    fn wrong_signer_fails_verification() {
        // Signed by a key that is not the debited account: structurally
        // valid, semantically theft. Must not verify.
        let owner = AccountKeypair::generate();
        let intruder = AccountKeypair::generate();
        let signed = UnsignedTransfer::from_plan(&sample_plan(&owner)).sign(&intruder);
        assert!(!signed.verify());
    }

    #[test]
    fn tampered_amount_fails_verification() {
        let kp = AccountKeypair::generate();
        let mut signed = UnsignedTransfer::from_plan(&sample_plan(&kp)).sign(&kp);
        signed.instruction.amount_lux = 999_999_999;
        assert!(!signed.verify());
    }

    #[test]
    fn wire_roundtrip_unsigned() {
        let kp = AccountKeypair::generate();
        let unsigned = UnsignedTransfer::from_plan(&sample_plan(&kp));
        let recovered = UnsignedTransfer::from_bytes(&unsigned.to_bytes()).unwrap();
        assert_eq!(recovered, unsigned);
    }

    #[test]
    fn wire_roundtrip_signed() {
        let kp = AccountKeypair::generate();
        let signed = UnsignedTransfer::from_plan(&sample_plan(&kp)).sign(&kp);
        let recovered = SignedTransfer::from_bytes(&signed.to_bytes()).unwrap();
        assert_eq!(recovered, signed);
        assert!(recovered.verify());
    }

    #[test]
    fn garbage_bytes_rejected() {
        assert!(SignedTransfer::from_bytes(b"junk").is_err());
        assert!(UnsignedTransfer::from_bytes(b"junk").is_err());
    }

    #[test]
    fn tx_id_is_base58_signature() {
        let kp = AccountKeypair::generate();
        let signed = UnsignedTransfer::from_plan(&sample_plan(&kp)).sign(&kp);
        let id = signed.tx_id();
        let decoded = bs58::decode(&id.0).into_vec().unwrap();
        assert_eq!(decoded.len(), 64);
    }
}
