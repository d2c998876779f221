//! # Backend Adapters
//!
//! One adapter per way of reaching a signing authority, all behind the
//! same two-operation capability surface. The orchestrator depends only on
//! [`WalletBackend`]; which transport actually carries the request is the
//! adapter's business.
//!
//! Two of the three adapters resolve in-process. The deep-link adapter
//! never does: both of its operations end with the browser navigating
//! away and a `Pending` marker, and the real result arrives on a later
//! page load through the resumption handler.

pub mod deeplink;
pub mod injected;
pub mod keypair;

use async_trait::async_trait;
use thiserror::Error;

use crate::crypto::keys::KeyFormatError;
use crate::ledger::{NetworkError, TxId};
use crate::session::{BackendKind, StoreError, WalletSession};
use crate::transfer::UnsignedTransfer;

pub use deeplink::{DeepLinkBackend, DeepLinkWallet};
pub use injected::InjectedBackend;
pub use keypair::KeypairBackend;

/// What a connect attempt produced.
#[derive(Debug)]
pub enum ConnectOutcome {
    /// The session is live right now.
    Established(WalletSession),
    /// The browser has navigated away; the result arrives on a later page
    /// load, if at all.
    Pending,
}

/// What a sign-and-submit attempt produced.
#[derive(Debug)]
pub enum TransferOutcome {
    /// Submitted to the network. Finality has not been awaited yet.
    Settled(TxId),
    /// The browser has navigated away mid-transfer.
    Pending,
}

#[derive(Debug, Error)]
pub enum BackendError {
    /// No injected wallet, and no mobile fallback applies.
    #[error("no wallet found; install one from {install_url}")]
    NotInstalled { install_url: String },

    #[error(transparent)]
    Format(#[from] KeyFormatError),

    /// The user declined in the wallet's UI, or the wallet timed out
    /// waiting for them.
    #[error("the wallet declined the request: {0}")]
    Declined(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("invalid wallet configuration: {0}")]
    Config(String),

    /// The session's signing handle belongs to a different backend.
    /// Indicates a bug in session wiring, not a user error.
    #[error("session signing handle does not match this backend")]
    HandleMismatch,
}

/// The uniform capability surface over all three transports.
#[async_trait]
pub trait WalletBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Establish a session, or kick off a round trip that will.
    async fn connect(&self) -> Result<ConnectOutcome, BackendError>;

    /// Sign the transfer and get it onto the network.
    ///
    /// The session is passed in because the signing authority lives on it
    /// (provider reference or key material), not on the adapter.
    async fn sign_and_submit(
        &self,
        session: &WalletSession,
        transfer: UnsignedTransfer,
    ) -> Result<TransferOutcome, BackendError>;
}
