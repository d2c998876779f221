//! # Page Environment
//!
//! The seam between the orchestrator and whatever is hosting it: injected
//! provider discovery, mobile detection, navigation, and URL rewriting all
//! go through the [`Browser`] trait. Production embeds supply a real
//! binding; tests and the CLI demo use [`HeadlessBrowser`], which records
//! every navigation instead of performing one.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

use crate::crypto::keys::AccountKeypair;
use crate::ledger::{Address, LedgerClient, TxId};
use crate::transfer::UnsignedTransfer;

/// An injected provider call failed.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The user declined the request in the wallet's own UI.
    #[error("declined: {0}")]
    Declined(String),

    #[error("provider error: {0}")]
    Other(String),
}

/// The request/response surface of an in-page injected wallet object.
///
/// Calls resolve in-process; the wallet's own UI handles user approval
/// before the future completes.
#[async_trait]
pub trait InjectedProvider: Send + Sync {
    /// Request a connection. Resolves to the wallet's account address.
    async fn connect(&self) -> Result<Address, ProviderError>;

    /// Sign the transfer and submit it to the network on our behalf.
    /// Resolves to the transaction id once the wallet has submitted.
    async fn sign_and_submit(&self, transfer: &UnsignedTransfer) -> Result<TxId, ProviderError>;

    /// Tear down the wallet-side session. Infallible by contract; a wallet
    /// that errors on disconnect has nothing useful to tell us.
    async fn disconnect(&self);
}

/// What the orchestrator needs from the hosting page.
pub trait Browser: Send + Sync {
    /// The injected wallet provider, if one advertises itself on this page.
    fn injected_provider(&self) -> Option<Arc<dyn InjectedProvider>>;

    /// Whether the user agent is a mobile browser. Decides the fallback
    /// when no provider is injected.
    fn is_mobile(&self) -> bool;

    /// The page's current URL, query string included.
    fn current_url(&self) -> Url;

    /// Navigate away. For the deep-link backend this is the point of no
    /// return: the page context is gone until the wallet redirects back.
    fn navigate(&self, url: &Url);

    /// Rewrite the visible URL without navigating (history replacement).
    fn replace_url(&self, url: &Url);

    /// Open a URL in a new context (install links).
    fn open_external(&self, url: &Url);
}

// ---------------------------------------------------------------------------
// Headless Implementation
// ---------------------------------------------------------------------------

#[derive(Default)]
struct HeadlessInner {
    provider: Option<Arc<dyn InjectedProvider>>,
    mobile: bool,
    current_url: Option<Url>,
    navigations: Vec<Url>,
    replacements: Vec<Url>,
    external_opens: Vec<Url>,
}

/// A [`Browser`] that goes nowhere. Every navigation is recorded and the
/// current URL is whatever the test last set, which makes deep-link round
/// trips fully scriptable: read the recorded outbound URL, compute the
/// wallet's reply, set it as the current URL, resume.
#[derive(Clone, Default)]
pub struct HeadlessBrowser {
    inner: Arc<Mutex<HeadlessInner>>,
}

impl HeadlessBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install an injected provider, as if a wallet extension were present.
    pub fn install_provider(&self, provider: Arc<dyn InjectedProvider>) {
        self.inner.lock().provider = Some(provider);
    }

    pub fn set_mobile(&self, mobile: bool) {
        self.inner.lock().mobile = mobile;
    }

    pub fn set_current_url(&self, url: Url) {
        self.inner.lock().current_url = Some(url);
    }

    /// Every `navigate` target so far, oldest first.
    pub fn navigations(&self) -> Vec<Url> {
        self.inner.lock().navigations.clone()
    }

    /// Every `replace_url` target so far, oldest first.
    pub fn replacements(&self) -> Vec<Url> {
        self.inner.lock().replacements.clone()
    }

    /// Every `open_external` target so far, oldest first.
    pub fn external_opens(&self) -> Vec<Url> {
        self.inner.lock().external_opens.clone()
    }
}

impl Browser for HeadlessBrowser {
    fn injected_provider(&self) -> Option<Arc<dyn InjectedProvider>> {
        self.inner.lock().provider.clone()
    }

    fn is_mobile(&self) -> bool {
        self.inner.lock().mobile
    }

    fn current_url(&self) -> Url {
        self.inner
            .lock()
            .current_url
            .clone()
            .unwrap_or_else(|| Url::parse("https://app.example.invalid/").expect("static url"))
    }

    fn navigate(&self, url: &Url) {
        let mut inner = self.inner.lock();
        inner.navigations.push(url.clone());
        inner.current_url = Some(url.clone());
    }

    fn replace_url(&self, url: &Url) {
        let mut inner = self.inner.lock();
        inner.replacements.push(url.clone());
        inner.current_url = Some(url.clone());
    }

    fn open_external(&self, url: &Url) {
        self.inner.lock().external_opens.push(url.clone());
    }
}

// ---------------------------------------------------------------------------
// Scripted Provider
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ScriptedInner {
    decline_next: Option<String>,
    connect_count: usize,
    disconnect_count: usize,
}

/// An [`InjectedProvider`] backed by a real keypair and a real ledger
/// client: it actually signs and actually submits, so tests exercise the
/// same bytes a cooperative wallet extension would produce.
pub struct ScriptedProvider {
    keypair: AccountKeypair,
    ledger: Arc<dyn LedgerClient>,
    inner: Mutex<ScriptedInner>,
}

impl ScriptedProvider {
    pub fn new(keypair: AccountKeypair, ledger: Arc<dyn LedgerClient>) -> Self {
        Self {
            keypair,
            ledger,
            inner: Mutex::new(ScriptedInner::default()),
        }
    }

    /// Make the next provider call fail as a user decline.
    pub fn decline_next(&self, reason: &str) {
        self.inner.lock().decline_next = Some(reason.to_string());
    }

    pub fn connect_count(&self) -> usize {
        self.inner.lock().connect_count
    }

    pub fn disconnect_count(&self) -> usize {
        self.inner.lock().disconnect_count
    }

    fn take_decline(&self) -> Option<String> {
        self.inner.lock().decline_next.take()
    }
}

#[async_trait]
impl InjectedProvider for ScriptedProvider {
    async fn connect(&self) -> Result<Address, ProviderError> {
        if let Some(reason) = self.take_decline() {
            return Err(ProviderError::Declined(reason));
        }
        self.inner.lock().connect_count += 1;
        Ok(self.keypair.address())
    }

    async fn sign_and_submit(&self, transfer: &UnsignedTransfer) -> Result<TxId, ProviderError> {
        if let Some(reason) = self.take_decline() {
            return Err(ProviderError::Declined(reason));
        }
        let signed = transfer.clone().sign(&self.keypair);
        self.ledger
            .submit(&signed.to_bytes())
            .await
            .map_err(|e| ProviderError::Other(e.to_string()))
    }

    async fn disconnect(&self) {
        self.inner.lock().disconnect_count += 1;
    }
}
