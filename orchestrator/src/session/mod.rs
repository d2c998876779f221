//! # Wallet Sessions
//!
//! The single source of truth for "who is connected": the session record,
//! the polymorphic signing handle, and the flow state machine the
//! orchestrator walks through.

pub mod store;

use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::browser::InjectedProvider;
use crate::crypto::keys::AccountKeypair;
use crate::ledger::Address;

pub use store::{InMemorySessionStore, PendingRoundTrip, Purpose, SessionStore, StoreError};

/// The three ways of reaching a signing authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Same-process injected provider object.
    Injected,
    /// Out-of-process mobile wallet reached by deep-link redirect.
    DeepLink,
    /// User-supplied raw private key, signed locally.
    RawKeypair,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::Injected => "injected",
            BackendKind::DeepLink => "deep-link",
            BackendKind::RawKeypair => "raw-keypair",
        };
        write!(f, "{}", name)
    }
}

/// How a connected session signs, polymorphic over backend.
#[derive(Clone)]
pub enum SigningHandle {
    /// A live reference to the injected provider object.
    Injected(Arc<dyn InjectedProvider>),
    /// Key material held in-process. Signing needs nobody's approval.
    Keypair(AccountKeypair),
    /// No persistent handle: every signing operation re-triggers a full
    /// deep-link round trip.
    Redirect,
}

impl fmt::Debug for SigningHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SigningHandle::Injected(_) => write!(f, "SigningHandle::Injected"),
            SigningHandle::Keypair(kp) => write!(f, "SigningHandle::Keypair({})", kp.address()),
            SigningHandle::Redirect => write!(f, "SigningHandle::Redirect"),
        }
    }
}

/// A connected wallet session.
///
/// Created by a successful connect, destroyed by disconnect or a reload
/// without a resumable round trip. Never persisted: the only thing that
/// survives a page teardown is the pending-round-trip entry in the
/// [`SessionStore`].
#[derive(Debug, Clone)]
pub struct WalletSession {
    pub id: Uuid,
    pub kind: BackendKind,
    /// Immutable once set.
    pub address: Address,
    /// Last-observed spendable balance in lux. Mutated only by explicit
    /// refresh, never inferred from submissions.
    pub balance_lux: u64,
    pub(crate) handle: SigningHandle,
}

impl WalletSession {
    pub fn new(kind: BackendKind, address: Address, handle: SigningHandle) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            address,
            balance_lux: 0,
            handle,
        }
    }
}

/// The orchestrator's flow state.
///
/// `AwaitingApproval` is reachable only for the injected and deep-link
/// backends; the raw-keypair path goes straight from `Preparing` to
/// `Settling` because there is no second party to ask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Disconnected,
    Connecting,
    Connected,
    Preparing,
    AwaitingApproval,
    Settling,
    /// The last operation failed. Recoverable: the user retries or
    /// disconnects; nothing is retried automatically.
    Failed,
}

impl FlowState {
    /// A transfer may start from here. `Failed` qualifies because retry is
    /// always a fresh user-initiated call, never an automatic one.
    pub fn can_start_transfer(&self) -> bool {
        matches!(self, FlowState::Connected | FlowState::Failed)
    }

    /// A transfer is somewhere between "balance read" and "finalized".
    /// A second transfer must not race it.
    pub fn transfer_in_flight(&self) -> bool {
        matches!(
            self,
            FlowState::Preparing | FlowState::AwaitingApproval | FlowState::Settling
        )
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlowState::Disconnected => "disconnected",
            FlowState::Connecting => "connecting",
            FlowState::Connected => "connected",
            FlowState::Preparing => "preparing",
            FlowState::AwaitingApproval => "awaiting approval",
            FlowState::Settling => "settling",
            FlowState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_starts_with_zero_balance() {
        let session = WalletSession::new(
            BackendKind::DeepLink,
            Address::from_bytes([1u8; 32]),
            SigningHandle::Redirect,
        );
        assert_eq!(session.balance_lux, 0);
    }

    #[test]
    fn session_ids_are_unique() {
        let addr = Address::from_bytes([1u8; 32]);
        let a = WalletSession::new(BackendKind::DeepLink, addr, SigningHandle::Redirect);
        let b = WalletSession::new(BackendKind::DeepLink, addr, SigningHandle::Redirect);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn in_flight_states_block_a_second_transfer() {
        for state in [
            FlowState::Preparing,
            FlowState::AwaitingApproval,
            FlowState::Settling,
        ] {
            assert!(state.transfer_in_flight());
            assert!(!state.can_start_transfer());
        }
    }

    #[test]
    fn failed_state_allows_retry() {
        assert!(FlowState::Failed.can_start_transfer());
        assert!(!FlowState::Disconnected.can_start_transfer());
    }

    #[test]
    fn keypair_handle_debug_does_not_leak_secrets() {
        let kp = AccountKeypair::generate();
        let addr = kp.address();
        let shown = format!("{:?}", SigningHandle::Keypair(kp));
        assert!(shown.contains(&addr.to_string()));
        assert!(!shown.contains("signing_key"));
    }
}
