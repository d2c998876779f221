//! # Transfer Orchestrator
//!
//! The public face of the crate: a state machine that establishes a wallet
//! session over any of the three backends, sweeps the spendable balance
//! (minus the reserve) to the configured destination, and reconciles
//! deep-link round trips when control returns on a later page load.
//!
//! Policy decisions live here and nowhere else:
//!
//! - Nothing is retried automatically. Every retry is the user acting again.
//! - At most one transfer is in flight per session; a second attempt is
//!   rejected, not raced against the same balance snapshot.
//! - Errors before submission are "not sent". A lost finality wait after
//!   submission is "sent, status unknown" -- a different variant, because
//!   conflating the two would lie to the user about where their money is.

mod error;
mod events;

pub use error::SweepError;
pub use events::SweepEvent;

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::backend::{
    ConnectOutcome, DeepLinkBackend, DeepLinkWallet, InjectedBackend, KeypairBackend,
    TransferOutcome, WalletBackend,
};
use crate::browser::Browser;
use crate::config::{BALANCE_POLL_INTERVAL, RESERVE_LUX};
use crate::crypto::handshake::RoundTripPayload;
use crate::ledger::{Address, FinalityStatus, LedgerClient, TxId};
use crate::overlay::OverlayEvent;
use crate::resume::Resumption;
use crate::session::{
    BackendKind, FlowState, Purpose, SessionStore, SigningHandle, WalletSession,
};
use crate::transfer::{TransferPlan, UnsignedTransfer};

/// Tunables. [`Default`] is the shipped product configuration, minus the
/// destination, which has no sane default and must be set explicitly.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Where swept funds go. `None` fails every transfer with a
    /// configuration error.
    pub destination: Option<Address>,
    pub wallet: DeepLinkWallet,
    pub reserve_lux: u64,
    pub poll_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            destination: None,
            wallet: DeepLinkWallet::default(),
            reserve_lux: RESERVE_LUX,
            poll_interval: BALANCE_POLL_INTERVAL,
        }
    }
}

/// How a connect should be performed.
#[derive(Debug)]
pub enum ConnectRequest {
    Injected,
    DeepLink,
    /// The user's pasted secret key, verbatim.
    RawKeypair { pasted: String },
}

/// Result of a connect call that did not error.
#[derive(Debug)]
pub enum ConnectStatus {
    Connected { address: Address },
    /// The browser has navigated to the wallet; the session, if any,
    /// arrives through [`Orchestrator::resume`] on a later page load.
    RedirectIssued,
}

/// Result of a transfer call that did not error.
#[derive(Debug)]
pub enum TransferStatus {
    Settled { tx_id: TxId },
    RedirectIssued,
}

/// What a page-load resumption found.
#[derive(Debug)]
pub enum ResumeOutcome {
    /// Plain page load, or a stale return already consumed.
    NoRoundTrip,
    Connected { address: Address },
    TransferSettled { tx_id: TxId },
}

struct Shared {
    flow: FlowState,
    session: Option<WalletSession>,
    poller: Option<JoinHandle<()>>,
}

/// See module docs.
pub struct Orchestrator {
    config: OrchestratorConfig,
    ledger: Arc<dyn LedgerClient>,
    browser: Arc<dyn Browser>,
    store: Arc<dyn SessionStore>,
    shared: Arc<Mutex<Shared>>,
    events: broadcast::Sender<SweepEvent>,
}

impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        ledger: Arc<dyn LedgerClient>,
        browser: Arc<dyn Browser>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            config,
            ledger,
            browser,
            store,
            shared: Arc::new(Mutex::new(Shared {
                flow: FlowState::Disconnected,
                session: None,
                poller: None,
            })),
            events,
        }
    }

    // -- observation ------------------------------------------------------

    pub fn subscribe(&self) -> broadcast::Receiver<SweepEvent> {
        self.events.subscribe()
    }

    pub fn flow_state(&self) -> FlowState {
        self.shared.lock().flow
    }

    pub fn session_address(&self) -> Option<Address> {
        self.shared.lock().session.as_ref().map(|s| s.address)
    }

    /// Last-observed balance, zero when disconnected.
    pub fn balance_lux(&self) -> u64 {
        self.shared
            .lock()
            .session
            .as_ref()
            .map(|s| s.balance_lux)
            .unwrap_or(0)
    }

    // -- connect / disconnect ---------------------------------------------

    /// Establish a session over the requested backend. Any existing session
    /// is torn down first; a session with a transfer in flight is not.
    pub async fn connect(&self, request: ConnectRequest) -> Result<ConnectStatus, SweepError> {
        if self.shared.lock().flow.transfer_in_flight() {
            return Err(SweepError::TransferInFlight);
        }
        if self.shared.lock().session.is_some() {
            self.disconnect().await;
        }

        self.set_flow(FlowState::Connecting);
        let backend = self.connect_backend(&request);

        match backend.connect().await {
            Ok(ConnectOutcome::Established(session)) => {
                let address = session.address;
                if session.kind == BackendKind::RawKeypair {
                    self.emit(SweepEvent::UnattendedSigning);
                }
                self.install_session(session).await;
                Ok(ConnectStatus::Connected { address })
            }
            Ok(ConnectOutcome::Pending) => Ok(ConnectStatus::RedirectIssued),
            Err(err) => {
                let err: SweepError = err.into();
                // A rejected duplicate departure leaves the first round
                // trip pending and resumable; don't disturb the flow.
                if !matches!(err, SweepError::RoundTripPending) {
                    self.set_flow(FlowState::Disconnected);
                }
                Err(err)
            }
        }
    }

    /// Tear down the session: abort the poller, release the provider, clear
    /// any pending round trip, reset the visible balance to zero.
    pub async fn disconnect(&self) {
        let (session, poller) = {
            let mut shared = self.shared.lock();
            (shared.session.take(), shared.poller.take())
        };
        if let Some(poller) = poller {
            poller.abort();
        }
        if let Some(session) = &session {
            if let SigningHandle::Injected(provider) = &session.handle {
                provider.disconnect().await;
            }
        }
        self.store.clear();

        self.set_flow(FlowState::Disconnected);
        if session.is_some() {
            self.emit(SweepEvent::BalanceUpdated { lux: 0 });
            self.emit(SweepEvent::Disconnected);
        }
    }

    // -- transfer ---------------------------------------------------------

    /// Sweep `balance - reserve` to the configured destination.
    pub async fn transfer(&self) -> Result<TransferStatus, SweepError> {
        let destination = self.config.destination.ok_or_else(|| {
            SweepError::Configuration("destination address is not configured".to_string())
        })?;
        let (address, kind) = {
            let shared = self.shared.lock();
            if shared.flow.transfer_in_flight() {
                return Err(SweepError::TransferInFlight);
            }
            let session = shared.session.as_ref().ok_or(SweepError::NotConnected)?;
            if !shared.flow.can_start_transfer() {
                return Err(SweepError::NotConnected);
            }
            // An overlay-established session with no in-page provider has
            // nothing on this side that can sign; the wallet itself must
            // approve.
            if session.kind == BackendKind::Injected
                && matches!(session.handle, SigningHandle::Redirect)
            {
                return Err(SweepError::ApproveInWallet);
            }
            (session.address, session.kind)
        };

        self.set_flow(FlowState::Preparing);
        let result = self.run_transfer(address, destination, kind).await;
        match &result {
            Ok(TransferStatus::Settled { .. }) => self.set_flow(FlowState::Connected),
            // Redirect in flight: the flow stays AwaitingApproval until the
            // round trip resumes (or the page never comes back).
            Ok(TransferStatus::RedirectIssued) => {}
            Err(_) => self.set_flow(FlowState::Failed),
        }
        result
    }

    async fn run_transfer(
        &self,
        address: Address,
        destination: Address,
        kind: BackendKind,
    ) -> Result<TransferStatus, SweepError> {
        let balance = self.ledger.balance(&address).await?;
        self.observe_balance(address, balance);

        if balance <= self.config.reserve_lux {
            return Err(SweepError::InsufficientBalance {
                balance_lux: balance,
                reserve_lux: self.config.reserve_lux,
            });
        }
        let amount = balance - self.config.reserve_lux;
        let reference_point = self.ledger.reference_point().await?;

        let plan = TransferPlan {
            from: address,
            to: destination,
            amount_lux: amount,
            reference_point,
        };
        tracing::info!(
            from = %address.abbreviated(),
            amount_lux = amount,
            "transfer planned"
        );

        let session = self
            .shared
            .lock()
            .session
            .clone()
            .ok_or(SweepError::NotConnected)?;
        let backend = self.signing_backend(kind);

        // Raw keypair has no approval step to await.
        self.set_flow(match kind {
            BackendKind::RawKeypair => FlowState::Settling,
            _ => FlowState::AwaitingApproval,
        });

        match backend
            .sign_and_submit(&session, UnsignedTransfer::from_plan(&plan))
            .await?
        {
            TransferOutcome::Pending => Ok(TransferStatus::RedirectIssued),
            TransferOutcome::Settled(tx_id) => {
                self.set_flow(FlowState::Settling);
                self.settle(tx_id).await
            }
        }
    }

    /// The transfer is on the network. From here on, failure means
    /// something different than it did a moment ago.
    async fn settle(&self, tx_id: TxId) -> Result<TransferStatus, SweepError> {
        match self.ledger.await_finality(&tx_id).await {
            // The wait was lost, not the transaction. Say exactly that.
            Err(err) => {
                tracing::warn!(tx_id = %tx_id.truncated(), error = %err, "finality wait lost");
                Err(SweepError::SubmittedStatusUnknown { tx_id })
            }
            Ok(FinalityStatus::Failed) => Err(SweepError::TransferFailed(tx_id)),
            Ok(FinalityStatus::Finalized) => {
                if let Err(err) = self.refresh_balance().await {
                    tracing::warn!(error = %err, "post-settlement balance refresh failed");
                }
                self.emit(SweepEvent::TransferSettled {
                    tx_id: tx_id.clone(),
                });
                tracing::info!(tx_id = %tx_id.truncated(), "transfer finalized");
                Ok(TransferStatus::Settled { tx_id })
            }
        }
    }

    // -- resumption -------------------------------------------------------

    /// Run once per page load, before any user interaction. Completes a
    /// pending deep-link round trip if the current URL carries one.
    pub async fn resume(&self) -> Result<ResumeOutcome, SweepError> {
        let resumption = Resumption::new(
            self.browser.clone(),
            self.store.clone(),
            self.config.wallet.clone(),
        );

        let resumed = match resumption.run() {
            Ok(None) => return Ok(ResumeOutcome::NoRoundTrip),
            Ok(Some(resumed)) => resumed,
            Err(err) => {
                self.fail_round_trip();
                return Err(err.into());
            }
        };

        match (resumed.purpose, resumed.payload) {
            (Purpose::Connect, RoundTripPayload::Connected { address }) => {
                let address = Address::parse(&address).map_err(|_| {
                    self.fail_round_trip();
                    SweepError::HandshakeDecode
                })?;
                self.install_session(WalletSession::new(
                    BackendKind::DeepLink,
                    address,
                    SigningHandle::Redirect,
                ))
                .await;
                Ok(ResumeOutcome::Connected { address })
            }
            (Purpose::Sign, RoundTripPayload::Signed { transaction_id }) => {
                // The wallet signed and submitted on its side; our part of
                // the transfer is done.
                let tx_id = TxId(transaction_id);
                if self.shared.lock().session.is_some() {
                    self.set_flow(FlowState::Connected);
                    if let Err(err) = self.refresh_balance().await {
                        tracing::warn!(error = %err, "post-resume balance refresh failed");
                    }
                }
                self.emit(SweepEvent::TransferSettled {
                    tx_id: tx_id.clone(),
                });
                Ok(ResumeOutcome::TransferSettled { tx_id })
            }
            (_, RoundTripPayload::Declined { reason }) => {
                self.fail_round_trip();
                Err(SweepError::ApprovalDeclined(reason))
            }
            // Purpose and payload disagree: somebody replayed or spliced
            // parameters. Treat like any other undecodable return.
            (_, _) => {
                self.fail_round_trip();
                Err(SweepError::HandshakeDecode)
            }
        }
    }

    // -- balance ----------------------------------------------------------

    /// Read the balance now and publish the observation.
    pub async fn refresh_balance(&self) -> Result<u64, SweepError> {
        let address = self.session_address().ok_or(SweepError::NotConnected)?;
        let lux = self.ledger.balance(&address).await?;
        self.observe_balance(address, lux);
        Ok(lux)
    }

    // -- overlay ----------------------------------------------------------

    /// Apply an ambient event from the wallet-picker overlay.
    pub async fn handle_overlay_event(&self, event: OverlayEvent) {
        match event {
            OverlayEvent::Connect { address } => {
                if self.shared.lock().flow.transfer_in_flight() {
                    tracing::warn!("ignoring overlay connect during an in-flight transfer");
                    return;
                }
                // The overlay may have connected an extension wallet; if a
                // provider is injected, use it for signing.
                let handle = match self.browser.injected_provider() {
                    Some(provider) => SigningHandle::Injected(provider),
                    None => SigningHandle::Redirect,
                };
                self.install_session(WalletSession::new(BackendKind::Injected, address, handle))
                    .await;
            }
            OverlayEvent::Disconnect => self.disconnect().await,
        }
    }

    // -- internals --------------------------------------------------------

    fn connect_backend(&self, request: &ConnectRequest) -> Box<dyn WalletBackend> {
        match request {
            ConnectRequest::Injected => Box::new(InjectedBackend::new(
                self.browser.clone(),
                self.deeplink_backend(),
                self.config.wallet.install_url.clone(),
            )),
            ConnectRequest::DeepLink => Box::new(self.deeplink_backend()),
            ConnectRequest::RawKeypair { pasted } => Box::new(KeypairBackend::new(
                pasted.clone(),
                self.ledger.clone(),
            )),
        }
    }

    fn signing_backend(&self, kind: BackendKind) -> Box<dyn WalletBackend> {
        match kind {
            BackendKind::Injected => Box::new(InjectedBackend::new(
                self.browser.clone(),
                self.deeplink_backend(),
                self.config.wallet.install_url.clone(),
            )),
            BackendKind::DeepLink => Box::new(self.deeplink_backend()),
            BackendKind::RawKeypair => Box::new(KeypairBackend::signer(self.ledger.clone())),
        }
    }

    fn deeplink_backend(&self) -> DeepLinkBackend {
        DeepLinkBackend::new(
            self.browser.clone(),
            self.store.clone(),
            self.config.wallet.clone(),
        )
    }

    async fn install_session(&self, session: WalletSession) {
        let address = session.address;
        let kind = session.kind;
        {
            let mut shared = self.shared.lock();
            shared.session = Some(session);
        }
        self.set_flow(FlowState::Connected);
        self.emit(SweepEvent::Connected { address, kind });
        tracing::info!(address = %address.abbreviated(), backend = %kind, "session established");

        if let Err(err) = self.refresh_balance().await {
            tracing::warn!(error = %err, "initial balance read failed");
        }
        self.start_poller(address);
    }

    fn start_poller(&self, address: Address) {
        let ledger = self.ledger.clone();
        let shared = self.shared.clone();
        let events = self.events.clone();
        let interval = self.config.poll_interval;

        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                match ledger.balance(&address).await {
                    Ok(lux) => {
                        let mut guard = shared.lock();
                        match guard.session.as_mut() {
                            Some(session) if session.address == address => {
                                session.balance_lux = lux;
                                let _ = events.send(SweepEvent::BalanceUpdated { lux });
                            }
                            // Session gone or replaced: this poller is stale.
                            _ => break,
                        }
                    }
                    // Polling is best-effort; a failed read keeps the last
                    // successful observation.
                    Err(err) => tracing::debug!(error = %err, "balance poll failed"),
                }
            }
        });

        let mut shared = self.shared.lock();
        if let Some(old) = shared.poller.replace(handle) {
            old.abort();
        }
    }

    /// A round trip ended badly. With a live session this is a failed
    /// operation; without one it just leaves us disconnected.
    fn fail_round_trip(&self) {
        let has_session = self.shared.lock().session.is_some();
        self.set_flow(if has_session {
            FlowState::Failed
        } else {
            FlowState::Disconnected
        });
    }

    fn observe_balance(&self, address: Address, lux: u64) {
        let mut shared = self.shared.lock();
        if let Some(session) = shared.session.as_mut() {
            if session.address == address {
                session.balance_lux = lux;
            }
        }
        drop(shared);
        self.emit(SweepEvent::BalanceUpdated { lux });
    }

    fn set_flow(&self, flow: FlowState) {
        let changed = {
            let mut shared = self.shared.lock();
            if shared.flow == flow {
                false
            } else {
                shared.flow = flow;
                true
            }
        };
        if changed {
            tracing::debug!(state = %flow, "flow state changed");
            self.emit(SweepEvent::StateChanged(flow));
        }
    }

    fn emit(&self, event: SweepEvent) {
        // Nobody listening is fine; events are observability, not control.
        let _ = self.events.send(event);
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        if let Some(poller) = self.shared.lock().poller.take() {
            poller.abort();
        }
    }
}
