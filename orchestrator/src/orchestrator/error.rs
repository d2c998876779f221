//! The orchestrator-boundary error taxonomy. Every failure from a backend
//! adapter, the resumption handler, or the ledger facade is converted into
//! one of these before it reaches a caller; nothing escapes raw.
//!
//! Two variants exist precisely because they must never be conflated:
//! [`SweepError::Network`] before submission means "not sent", while
//! [`SweepError::SubmittedStatusUnknown`] means "sent, status unknown" --
//! the money may well have moved.

use thiserror::Error;

use crate::backend::BackendError;
use crate::crypto::keys::KeyFormatError;
use crate::ledger::{NetworkError, TxId};
use crate::resume::ResumeError;
use crate::session::StoreError;

#[derive(Debug, Error)]
pub enum SweepError {
    /// No injected wallet and no mobile fallback applied.
    #[error("no wallet found; install one from {install_url}")]
    NotInstalled { install_url: String },

    /// The pasted raw key material is malformed.
    #[error(transparent)]
    Format(#[from] KeyFormatError),

    /// The balance does not exceed the reserve; there is nothing to sweep.
    #[error(
        "balance of {balance_lux} lux does not exceed the {reserve_lux} lux reserve; \
         more than {reserve_lux} lux is required"
    )]
    InsufficientBalance { balance_lux: u64, reserve_lux: u64 },

    #[error("no wallet session is connected")]
    NotConnected,

    #[error("configuration error: {0}")]
    Configuration(String),

    /// A wallet return could not be decrypted or decoded. Terminal for
    /// that round trip; the ephemeral key is already consumed.
    #[error("could not decode the wallet's response")]
    HandshakeDecode,

    /// An RPC failed before anything was submitted. Nothing was sent.
    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("the wallet declined the request: {0}")]
    ApprovalDeclined(String),

    /// The session came through the wallet-picker overlay and no in-page
    /// provider is available to sign; the connected wallet itself has to
    /// approve the transfer.
    #[error("approve the transfer in your connected wallet")]
    ApproveInWallet,

    /// The network accepted the submission and then rejected or dropped it.
    #[error("transaction {0} failed on the network")]
    TransferFailed(TxId),

    /// Submitted, but the finality wait was lost. The transfer may or may
    /// not have landed; the user must check the network.
    #[error(
        "transaction {} was submitted but its status is unknown; check the network",
        .tx_id.truncated()
    )]
    SubmittedStatusUnknown { tx_id: TxId },

    #[error("a transfer is already in flight")]
    TransferInFlight,

    /// A deep-link round trip is already pending; it must resolve or be
    /// abandoned before another one starts.
    #[error("a wallet round trip is already pending")]
    RoundTripPending,

    #[error(transparent)]
    Store(StoreError),

    /// Session wiring reached an impossible combination. A bug, not a
    /// user-recoverable condition.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<BackendError> for SweepError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotInstalled { install_url } => SweepError::NotInstalled { install_url },
            BackendError::Format(e) => SweepError::Format(e),
            BackendError::Declined(reason) => SweepError::ApprovalDeclined(reason),
            BackendError::Store(StoreError::SlotOccupied) => SweepError::RoundTripPending,
            BackendError::Store(e) => SweepError::Store(e),
            BackendError::Network(e) => SweepError::Network(e),
            BackendError::Config(msg) => SweepError::Configuration(msg),
            BackendError::HandleMismatch => {
                SweepError::Internal("signing handle does not match backend".to_string())
            }
        }
    }
}

impl From<ResumeError> for SweepError {
    fn from(err: ResumeError) -> Self {
        match err {
            ResumeError::MalformedReturn(_) | ResumeError::Handshake(_) => {
                SweepError::HandshakeDecode
            }
            ResumeError::Store(StoreError::SlotOccupied) => SweepError::RoundTripPending,
            ResumeError::Store(e) => SweepError::Store(e),
        }
    }
}
