//! # Raw-Keypair Backend
//!
//! The user pastes their secret key and this process becomes the wallet.
//! Connect is a parse; signing is local and immediate, with no approval
//! step anywhere. This is the only backend where the authority to spend is
//! exercised without a second party's consent, and callers are expected to
//! warn the user accordingly at connect time.

use async_trait::async_trait;
use std::sync::Arc;

use crate::crypto::keys::AccountKeypair;
use crate::ledger::LedgerClient;
use crate::session::{BackendKind, SigningHandle, WalletSession};
use crate::transfer::UnsignedTransfer;

use super::{BackendError, ConnectOutcome, TransferOutcome, WalletBackend};

/// See module docs.
pub struct KeypairBackend {
    pasted: String,
    ledger: Arc<dyn LedgerClient>,
}

impl KeypairBackend {
    /// `pasted` is the user's input, verbatim: a JSON byte array of the
    /// 64-byte secret-key export. Nothing is parsed until `connect`.
    pub fn new(pasted: String, ledger: Arc<dyn LedgerClient>) -> Self {
        Self { pasted, ledger }
    }

    /// A signing-only instance for an already-established session. The key
    /// material lives on the session's handle; `connect` on this instance
    /// fails.
    pub fn signer(ledger: Arc<dyn LedgerClient>) -> Self {
        Self {
            pasted: String::new(),
            ledger,
        }
    }
}

#[async_trait]
impl WalletBackend for KeypairBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::RawKeypair
    }

    async fn connect(&self) -> Result<ConnectOutcome, BackendError> {
        let keypair = AccountKeypair::parse_pasted(&self.pasted)?;
        let address = keypair.address();
        tracing::info!(address = %address.abbreviated(), "raw keypair parsed; signing is unattended");

        Ok(ConnectOutcome::Established(WalletSession::new(
            BackendKind::RawKeypair,
            address,
            SigningHandle::Keypair(keypair),
        )))
    }

    async fn sign_and_submit(
        &self,
        session: &WalletSession,
        transfer: UnsignedTransfer,
    ) -> Result<TransferOutcome, BackendError> {
        let SigningHandle::Keypair(keypair) = &session.handle else {
            return Err(BackendError::HandleMismatch);
        };
        let signed = transfer.sign(keypair);
        let tx_id = self.ledger.submit(&signed.to_bytes()).await?;
        Ok(TransferOutcome::Settled(tx_id))
    }
}
