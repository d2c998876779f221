//! Observable events. UI collaborators subscribe through
//! [`Orchestrator::subscribe`] and render whatever arrives; the
//! orchestrator never calls back into anything.
//!
//! [`Orchestrator::subscribe`]: super::Orchestrator::subscribe

use crate::ledger::{Address, TxId};
use crate::session::{BackendKind, FlowState};

#[derive(Debug, Clone)]
pub enum SweepEvent {
    /// The flow state machine moved.
    StateChanged(FlowState),

    /// A session was established.
    Connected { address: Address, kind: BackendKind },

    /// The active backend signs without any approval step. Emitted once at
    /// connect time for the raw-keypair backend, so the user is told before
    /// the first unattended signature, not after.
    UnattendedSigning,

    /// A fresh balance observation, from an explicit refresh or the poller.
    BalanceUpdated { lux: u64 },

    /// A transfer finalized. `tx_id.truncated()` is the display form.
    TransferSettled { tx_id: TxId },

    /// The session ended.
    Disconnected,
}
