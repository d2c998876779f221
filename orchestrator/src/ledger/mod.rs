//! # Ledger Client Facade
//!
//! The narrow RPC surface the orchestrator needs from the Helio network:
//! balance query, reference-point fetch, raw-transaction submission, and a
//! finality wait. Four operations, nothing else.
//!
//! The real network client lives behind [`LedgerClient`]; this crate ships
//! only the trait, the wire types, and an in-memory implementation for
//! tests and demos. Every operation can fail with a [`NetworkError`], and
//! none of them are retried here -- a failed user-initiated operation is
//! surfaced immediately, and the retry is the user pressing the button
//! again.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub use memory::{InMemoryLedger, RpcOp};

/// An RPC operation against the network failed.
///
/// Deliberately a single kind: the orchestrator treats every network
/// failure identically (surface, don't retry), so a taxonomy of timeouts
/// vs. 5xxs vs. DNS woes would be decoration.
#[derive(Debug, Error)]
#[error("network error: {0}")]
pub struct NetworkError(pub String);

// ---------------------------------------------------------------------------
// Wire Types
// ---------------------------------------------------------------------------

/// A Helio account address: 32 Ed25519 public-key bytes, displayed base58.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address([u8; 32]);

impl Address {
    /// Wrap raw public-key bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse a base58-encoded address string.
    ///
    /// Rejects anything that doesn't decode to exactly 32 bytes. We don't
    /// validate curve membership here -- the ledger does, and an address is
    /// just an identifier on this side of the wire.
    pub fn parse(s: &str) -> Result<Self, AddressParseError> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|_| AddressParseError(s.len()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| AddressParseError(s.len()))?;
        Ok(Self(arr))
    }

    /// Raw public-key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Abbreviated form for logs and UI: first 6 and last 4 characters.
    pub fn abbreviated(&self) -> String {
        let full = self.to_string();
        if full.len() <= 10 {
            return full;
        }
        format!("{}..{}", &full[..6], &full[full.len() - 4..])
    }
}

/// The given string is not a base58-encoded 32-byte address.
#[derive(Debug, Error)]
#[error("not a valid base58 account address")]
pub struct AddressParseError(usize);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.abbreviated())
    }
}

/// A transaction identifier as reported by the network -- on Helio, the
/// base58-encoded signature of the submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxId(pub String);

impl TxId {
    /// Truncated form for success messages. Full ids are ~88 characters;
    /// the UI shows a prefix and an ellipsis.
    pub fn truncated(&self) -> String {
        let width = crate::config::TX_ID_DISPLAY_WIDTH;
        if self.0.len() <= width {
            self.0.clone()
        } else {
            format!("{}...", &self.0[..width])
        }
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An opaque recent-checkpoint token bounding transaction validity.
/// The orchestrator fetches it, embeds it, and never looks inside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencePoint(pub String);

/// Outcome of waiting for a submitted transaction to finalize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalityStatus {
    /// Irreversibly accepted by the network.
    Finalized,
    /// The network rejected or dropped the transaction.
    Failed,
}

// ---------------------------------------------------------------------------
// Client Trait
// ---------------------------------------------------------------------------

/// The four-operation RPC surface.
///
/// Implementations must not retry internally: the orchestrator's contract
/// with the user is that every retry is a fresh user-initiated call.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Current spendable balance of `address`, in lux.
    async fn balance(&self, address: &Address) -> Result<u64, NetworkError>;

    /// A recent checkpoint to anchor a transaction's validity window.
    async fn reference_point(&self) -> Result<ReferencePoint, NetworkError>;

    /// Submit raw signed-transaction bytes. Returns the transaction id.
    ///
    /// A successful return means the network *accepted* the submission,
    /// not that the transfer is final -- that's what [`await_finality`]
    /// is for.
    ///
    /// [`await_finality`]: LedgerClient::await_finality
    async fn submit(&self, raw_tx: &[u8]) -> Result<TxId, NetworkError>;

    /// Wait until the transaction is finalized or definitively failed.
    async fn await_finality(&self, tx_id: &TxId) -> Result<FinalityStatus, NetworkError>;
}
