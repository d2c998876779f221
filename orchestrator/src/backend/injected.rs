//! # Injected Backend
//!
//! The happy path on desktop: a wallet extension has injected a provider
//! object into the page, and both operations are plain in-process calls
//! against it.
//!
//! When no provider is present the fallback depends on the user agent. On
//! mobile we hand the whole connect over to the deep-link backend, because
//! mobile browsers don't run extensions but the wallet app is probably one
//! deep link away. On desktop there is nothing to fall back to; we open
//! the wallet's install page and report the failure.

use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

use crate::browser::{Browser, ProviderError};
use crate::ledger::NetworkError;
use crate::session::{BackendKind, SigningHandle, WalletSession};
use crate::transfer::UnsignedTransfer;

use super::{BackendError, ConnectOutcome, DeepLinkBackend, TransferOutcome, WalletBackend};

/// See module docs.
pub struct InjectedBackend {
    browser: Arc<dyn Browser>,
    /// Mobile fallback. Shares the wallet config, store, and browser.
    fallback: DeepLinkBackend,
    install_url: String,
}

impl InjectedBackend {
    pub fn new(browser: Arc<dyn Browser>, fallback: DeepLinkBackend, install_url: String) -> Self {
        Self {
            browser,
            fallback,
            install_url,
        }
    }
}

fn map_provider_error(err: ProviderError) -> BackendError {
    match err {
        ProviderError::Declined(reason) => BackendError::Declined(reason),
        ProviderError::Other(msg) => BackendError::Network(NetworkError(msg)),
    }
}

#[async_trait]
impl WalletBackend for InjectedBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Injected
    }

    async fn connect(&self) -> Result<ConnectOutcome, BackendError> {
        let Some(provider) = self.browser.injected_provider() else {
            if self.browser.is_mobile() {
                tracing::info!("no injected provider on mobile, falling back to deep link");
                return self.fallback.connect().await;
            }
            if let Ok(url) = Url::parse(&self.install_url) {
                self.browser.open_external(&url);
            }
            return Err(BackendError::NotInstalled {
                install_url: self.install_url.clone(),
            });
        };

        let address = provider.connect().await.map_err(map_provider_error)?;
        tracing::info!(address = %address.abbreviated(), "injected provider connected");

        Ok(ConnectOutcome::Established(WalletSession::new(
            BackendKind::Injected,
            address,
            SigningHandle::Injected(provider),
        )))
    }

    async fn sign_and_submit(
        &self,
        session: &WalletSession,
        transfer: UnsignedTransfer,
    ) -> Result<TransferOutcome, BackendError> {
        let SigningHandle::Injected(provider) = &session.handle else {
            return Err(BackendError::HandleMismatch);
        };
        let tx_id = provider
            .sign_and_submit(&transfer)
            .await
            .map_err(map_provider_error)?;
        Ok(TransferOutcome::Settled(tx_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DeepLinkWallet;
    use crate::browser::{HeadlessBrowser, ScriptedProvider};
    use crate::crypto::keys::AccountKeypair;
    use crate::ledger::InMemoryLedger;
    use crate::session::InMemorySessionStore;

    fn harness() -> (InjectedBackend, HeadlessBrowser, Arc<InMemoryLedger>) {
        let browser = HeadlessBrowser::new();
        browser.set_current_url(Url::parse("https://app.example.invalid/").unwrap());
        let ledger = Arc::new(InMemoryLedger::new());
        let wallet = DeepLinkWallet::default();
        let fallback = DeepLinkBackend::new(
            Arc::new(browser.clone()),
            Arc::new(InMemorySessionStore::new()),
            wallet.clone(),
        );
        let backend = InjectedBackend::new(Arc::new(browser.clone()), fallback, wallet.install_url);
        (backend, browser, ledger)
    }

    #[tokio::test]
    async fn connect_uses_present_provider() {
        let (backend, browser, ledger) = harness();
        let kp = AccountKeypair::generate();
        browser.install_provider(Arc::new(ScriptedProvider::new(kp.clone(), ledger)));

        let outcome = backend.connect().await.unwrap();
        let ConnectOutcome::Established(session) = outcome else {
            panic!("expected an established session");
        };
        assert_eq!(session.kind, BackendKind::Injected);
        assert_eq!(session.address, kp.address());
    }

    #[tokio::test]
    async fn missing_provider_on_desktop_reports_not_installed() {
        let (backend, browser, _ledger) = harness();

        let err = backend.connect().await.unwrap_err();
        assert!(matches!(err, BackendError::NotInstalled { .. }));
        // The install page was opened for the user.
        assert_eq!(browser.external_opens().len(), 1);
        assert!(browser.navigations().is_empty());
    }

    #[tokio::test]
    async fn missing_provider_on_mobile_falls_back_to_deep_link() {
        let (backend, browser, _ledger) = harness();
        browser.set_mobile(true);

        let outcome = backend.connect().await.unwrap();
        assert!(matches!(outcome, ConnectOutcome::Pending));
        // The fallback navigated to the wallet's connect deep link.
        assert!(browser.navigations()[0].path().ends_with("/connect"));
        assert!(browser.external_opens().is_empty());
    }

    #[tokio::test]
    async fn declined_connect_surfaces_as_declined() {
        let (backend, browser, ledger) = harness();
        let provider = Arc::new(ScriptedProvider::new(AccountKeypair::generate(), ledger));
        provider.decline_next("user rejected the request");
        browser.install_provider(provider);

        assert!(matches!(
            backend.connect().await,
            Err(BackendError::Declined(_))
        ));
    }
}
