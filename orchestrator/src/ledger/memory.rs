//! # In-Memory Ledger
//!
//! A deterministic, in-process [`LedgerClient`] used by the integration
//! tests and the CLI demo. It keeps real balances, decodes real submitted
//! transfers, and can be scripted to fail any single operation -- which is
//! exactly what you need to test a component whose error-handling policy
//! is "surface everything, retry nothing".

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::{Address, FinalityStatus, LedgerClient, NetworkError, ReferencePoint, TxId};
use crate::transfer::SignedTransfer;

/// Which RPC operation to sabotage next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcOp {
    Balance,
    ReferencePoint,
    Submit,
    Finality,
}

#[derive(Default)]
struct Inner {
    balances: HashMap<Address, u64>,
    /// One-shot failures: consumed the first time the operation runs.
    fail_next: HashSet<RpcOp>,
    /// Every accepted submission, in order.
    submissions: Vec<SignedTransfer>,
    /// Transaction ids that should report `Failed` from the finality wait.
    doomed: HashSet<TxId>,
    reference_counter: u64,
}

/// See module docs. Cheap to clone; all clones share state.
#[derive(Clone, Default)]
pub struct InMemoryLedger {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an account's balance directly. Test/demo seeding.
    pub fn set_balance(&self, address: Address, lux: u64) {
        self.inner.lock().balances.insert(address, lux);
    }

    /// Make the next call to `op` fail with a network error.
    pub fn fail_next(&self, op: RpcOp) {
        self.inner.lock().fail_next.insert(op);
    }

    /// Make the finality wait for `tx_id` report failure instead of success.
    pub fn doom(&self, tx_id: TxId) {
        self.inner.lock().doomed.insert(tx_id);
    }

    /// Every transfer accepted so far, in submission order.
    pub fn submissions(&self) -> Vec<SignedTransfer> {
        self.inner.lock().submissions.clone()
    }

    /// Number of accepted submissions. Convenient for "submit was never
    /// called" assertions.
    pub fn submission_count(&self) -> usize {
        self.inner.lock().submissions.len()
    }

    fn take_failure(&self, op: RpcOp) -> Result<(), NetworkError> {
        if self.inner.lock().fail_next.remove(&op) {
            return Err(NetworkError(format!("scripted failure for {:?}", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn balance(&self, address: &Address) -> Result<u64, NetworkError> {
        self.take_failure(RpcOp::Balance)?;
        Ok(*self.inner.lock().balances.get(address).unwrap_or(&0))
    }

    async fn reference_point(&self) -> Result<ReferencePoint, NetworkError> {
        self.take_failure(RpcOp::ReferencePoint)?;
        let mut inner = self.inner.lock();
        inner.reference_counter += 1;
        Ok(ReferencePoint(format!("ref-{}", inner.reference_counter)))
    }

    async fn submit(&self, raw_tx: &[u8]) -> Result<TxId, NetworkError> {
        self.take_failure(RpcOp::Submit)?;

        let transfer = SignedTransfer::from_bytes(raw_tx)
            .map_err(|e| NetworkError(format!("malformed transaction: {}", e)))?;
        if !transfer.verify() {
            return Err(NetworkError("invalid signature".to_string()));
        }

        let tx_id = transfer.tx_id();
        let mut inner = self.inner.lock();

        // Apply the transfer the way the network would: debit sender,
        // credit receiver. Insufficient funds at apply time is a rejection.
        let from = transfer.instruction.from;
        let to = transfer.instruction.to;
        let amount = transfer.instruction.amount_lux;

        let from_balance = *inner.balances.get(&from).unwrap_or(&0);
        if from_balance < amount {
            return Err(NetworkError("insufficient funds at submission".to_string()));
        }
        inner.balances.insert(from, from_balance - amount);
        *inner.balances.entry(to).or_insert(0) += amount;
        inner.submissions.push(transfer);

        Ok(tx_id)
    }

    async fn await_finality(&self, tx_id: &TxId) -> Result<FinalityStatus, NetworkError> {
        self.take_failure(RpcOp::Finality)?;
        if self.inner.lock().doomed.contains(tx_id) {
            return Ok(FinalityStatus::Failed);
        }
        Ok(FinalityStatus::Finalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::AccountKeypair;
    use crate::transfer::{TransferPlan, UnsignedTransfer};

    fn signed_transfer(from: &AccountKeypair, to: Address, amount: u64) -> SignedTransfer {
        let plan = TransferPlan {
            from: from.address(),
            to,
            amount_lux: amount,
            reference_point: ReferencePoint("ref-test".to_string()),
        };
        UnsignedTransfer::from_plan(&plan).sign(from)
    }

    #[tokio::test]
    async fn balances_default_to_zero() {
        let ledger = InMemoryLedger::new();
        let addr = Address::from_bytes([1u8; 32]);
        assert_eq!(ledger.balance(&addr).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn submit_moves_funds() {
        let ledger = InMemoryLedger::new();
        let sender = AccountKeypair::generate();
        let receiver = Address::from_bytes([9u8; 32]);
        ledger.set_balance(sender.address(), 150_000);

        let tx = signed_transfer(&sender, receiver, 50_000);
        let id = ledger.submit(&tx.to_bytes()).await.unwrap();

        assert_eq!(ledger.balance(&sender.address()).await.unwrap(), 100_000);
        assert_eq!(ledger.balance(&receiver).await.unwrap(), 50_000);
        assert_eq!(ledger.await_finality(&id).await.unwrap(), FinalityStatus::Finalized);
    }

    #[tokio::test]
    async fn scripted_failure_is_one_shot() {
        let ledger = InMemoryLedger::new();
        let addr = Address::from_bytes([2u8; 32]);

        ledger.fail_next(RpcOp::Balance);
        assert!(ledger.balance(&addr).await.is_err());
        // Second call succeeds: the failure was consumed.
        assert!(ledger.balance(&addr).await.is_ok());
    }

    #[tokio::test]
    async fn overspend_rejected_at_submission() {
        let ledger = InMemoryLedger::new();
        let sender = AccountKeypair::generate();
        ledger.set_balance(sender.address(), 10);

        let tx = signed_transfer(&sender, Address::from_bytes([9u8; 32]), 1_000);
        assert!(ledger.submit(&tx.to_bytes()).await.is_err());
        assert_eq!(ledger.submission_count(), 0);
    }

    #[tokio::test]
    async fn doomed_transaction_fails_finality() {
        let ledger = InMemoryLedger::new();
        let sender = AccountKeypair::generate();
        ledger.set_balance(sender.address(), 100_000);

        let tx = signed_transfer(&sender, Address::from_bytes([9u8; 32]), 1_000);
        let id = ledger.submit(&tx.to_bytes()).await.unwrap();
        ledger.doom(id.clone());

        assert_eq!(ledger.await_finality(&id).await.unwrap(), FinalityStatus::Failed);
    }

    #[tokio::test]
    async fn garbage_bytes_rejected() {
        let ledger = InMemoryLedger::new();
        assert!(ledger.submit(b"not a transaction").await.is_err());
    }
}
