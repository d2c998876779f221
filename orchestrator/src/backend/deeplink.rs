//! # Deep-Link Backend
//!
//! The redirect transport: every operation generates a fresh ephemeral
//! keypair, persists it in the session store, and navigates the browser to
//! a wallet-defined URL. Nothing returns synchronously; the wallet's reply
//! arrives on a later page load and is handled by the resumption module.
//!
//! The outbound URL carries `app_url` (our origin), `redirect_link` (our
//! page with the query stripped, so a stale round trip never piggybacks on
//! the return), `dapp_encryption_public_key` (base58 ephemeral public key),
//! and for signing additionally `transaction` (base58 serialized unsigned
//! transfer).

use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

use crate::browser::Browser;
use crate::config::{
    DEEPLINK_CONNECT_PATH, DEEPLINK_SIGN_PATH, DEFAULT_DEEPLINK_BASE_URL,
    DEFAULT_DEEPLINK_INSTALL_URL, DEFAULT_DEEPLINK_WALLET,
};
use crate::crypto::handshake::EphemeralHandshake;
use crate::session::{
    BackendKind, PendingRoundTrip, Purpose, SessionStore, SigningHandle, WalletSession,
};
use crate::transfer::UnsignedTransfer;

use super::{BackendError, ConnectOutcome, TransferOutcome, WalletBackend};

/// Identity and endpoints of a deep-link wallet.
///
/// The `name` doubles as the wire-level identity: the wallet marks its
/// return trips with a `{name}_encryption_public_key` query parameter.
#[derive(Debug, Clone)]
pub struct DeepLinkWallet {
    pub name: String,
    pub base_url: String,
    pub install_url: String,
}

impl Default for DeepLinkWallet {
    /// Spectre, the wallet this ships against.
    fn default() -> Self {
        Self {
            name: DEFAULT_DEEPLINK_WALLET.to_string(),
            base_url: DEFAULT_DEEPLINK_BASE_URL.to_string(),
            install_url: DEFAULT_DEEPLINK_INSTALL_URL.to_string(),
        }
    }
}

impl DeepLinkWallet {
    /// The query parameter that identifies this wallet's return trips.
    pub fn marker_param(&self) -> String {
        format!("{}_encryption_public_key", self.name)
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| BackendError::Config(format!("bad wallet base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| BackendError::Config("wallet base URL cannot carry paths".to_string()))?
            .push(path);
        Ok(url)
    }
}

/// See module docs.
pub struct DeepLinkBackend {
    browser: Arc<dyn Browser>,
    store: Arc<dyn SessionStore>,
    wallet: DeepLinkWallet,
}

impl DeepLinkBackend {
    pub fn new(
        browser: Arc<dyn Browser>,
        store: Arc<dyn SessionStore>,
        wallet: DeepLinkWallet,
    ) -> Self {
        Self {
            browser,
            store,
            wallet,
        }
    }

    /// Build the outbound URL for one round trip.
    fn round_trip_url(
        &self,
        path: &str,
        public_key: &[u8; 32],
        transaction: Option<&UnsignedTransfer>,
    ) -> Result<Url, BackendError> {
        let current = self.browser.current_url();
        let origin = current.origin().ascii_serialization();

        let mut redirect = current.clone();
        redirect.set_query(None);
        redirect.set_fragment(None);

        let mut url = self.wallet.endpoint(path)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("app_url", &origin)
                .append_pair("redirect_link", redirect.as_str())
                .append_pair(
                    "dapp_encryption_public_key",
                    &bs58::encode(public_key).into_string(),
                );
            if let Some(transfer) = transaction {
                pairs.append_pair(
                    "transaction",
                    &bs58::encode(transfer.to_bytes()).into_string(),
                );
            }
        }
        Ok(url)
    }

    /// Persist the ephemeral secret, then leave the page. Order matters:
    /// once `navigate` runs, the page context is gone.
    fn depart(
        &self,
        purpose: Purpose,
        path: &str,
        transaction: Option<&UnsignedTransfer>,
    ) -> Result<(), BackendError> {
        let handshake = EphemeralHandshake::generate();
        let url = self.round_trip_url(path, &handshake.public_key_bytes(), transaction)?;

        self.store.put_pending(&PendingRoundTrip {
            secret_key: handshake.secret_bytes(),
            purpose,
        })?;

        tracing::info!(wallet = %self.wallet.name, ?purpose, "navigating to wallet deep link");
        self.browser.navigate(&url);
        Ok(())
    }
}

#[async_trait]
impl WalletBackend for DeepLinkBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::DeepLink
    }

    async fn connect(&self) -> Result<ConnectOutcome, BackendError> {
        self.depart(Purpose::Connect, DEEPLINK_CONNECT_PATH, None)?;
        Ok(ConnectOutcome::Pending)
    }

    async fn sign_and_submit(
        &self,
        session: &WalletSession,
        transfer: UnsignedTransfer,
    ) -> Result<TransferOutcome, BackendError> {
        if !matches!(session.handle, SigningHandle::Redirect) {
            return Err(BackendError::HandleMismatch);
        }
        self.depart(Purpose::Sign, DEEPLINK_SIGN_PATH, Some(&transfer))?;
        Ok(TransferOutcome::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::HeadlessBrowser;
    use crate::ledger::{Address, ReferencePoint};
    use crate::session::{InMemorySessionStore, StoreError};
    use crate::transfer::TransferPlan;
    use std::collections::HashMap;

    fn backend() -> (DeepLinkBackend, HeadlessBrowser, Arc<InMemorySessionStore>) {
        let browser = HeadlessBrowser::new();
        browser.set_current_url(Url::parse("https://app.example.invalid/sweep?leftover=1").unwrap());
        let store = Arc::new(InMemorySessionStore::new());
        let backend = DeepLinkBackend::new(
            Arc::new(browser.clone()),
            store.clone(),
            DeepLinkWallet::default(),
        );
        (backend, browser, store)
    }

    fn query_map(url: &Url) -> HashMap<String, String> {
        url.query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[tokio::test]
    async fn connect_navigates_with_handshake_params() {
        let (backend, browser, store) = backend();

        assert!(matches!(
            backend.connect().await.unwrap(),
            ConnectOutcome::Pending
        ));

        let navigations = browser.navigations();
        assert_eq!(navigations.len(), 1);
        let url = &navigations[0];
        assert!(url.path().ends_with("/connect"));

        let params = query_map(url);
        assert_eq!(params["app_url"], "https://app.example.invalid");
        // Query stripped from the return URL.
        assert_eq!(params["redirect_link"], "https://app.example.invalid/sweep");

        // The advertised public key matches the persisted secret.
        let stored = store.take_pending().unwrap().unwrap();
        assert_eq!(stored.purpose, Purpose::Connect);
        let restored = EphemeralHandshake::from_secret_bytes(stored.secret_key);
        assert_eq!(
            params["dapp_encryption_public_key"],
            bs58::encode(restored.public_key_bytes()).into_string()
        );
    }

    #[tokio::test]
    async fn sign_carries_the_serialized_transfer() {
        let (backend, browser, _store) = backend();
        let from = Address::from_bytes([1u8; 32]);
        let session = WalletSession::new(BackendKind::DeepLink, from, SigningHandle::Redirect);
        let transfer = UnsignedTransfer::from_plan(&TransferPlan {
            from,
            to: Address::from_bytes([2u8; 32]),
            amount_lux: 50_000,
            reference_point: ReferencePoint("ref-1".to_string()),
        });

        backend
            .sign_and_submit(&session, transfer.clone())
            .await
            .unwrap();

        let url = &browser.navigations()[0];
        assert!(url.path().ends_with("/signAndSendTransaction"));

        let params = query_map(url);
        let bytes = bs58::decode(&params["transaction"]).into_vec().unwrap();
        assert_eq!(UnsignedTransfer::from_bytes(&bytes).unwrap(), transfer);
    }

    #[tokio::test]
    async fn occupied_slot_blocks_departure() {
        let (backend, browser, _store) = backend();
        backend.connect().await.unwrap();

        // Second round trip while the first is pending: rejected, and the
        // browser stays put.
        let err = backend.connect().await.unwrap_err();
        assert!(matches!(
            err,
            BackendError::Store(StoreError::SlotOccupied)
        ));
        assert_eq!(browser.navigations().len(), 1);
    }

    #[tokio::test]
    async fn foreign_handle_rejected() {
        let (backend, _browser, _store) = backend();
        let kp = crate::crypto::keys::AccountKeypair::generate();
        let session = WalletSession::new(
            BackendKind::RawKeypair,
            kp.address(),
            SigningHandle::Keypair(kp.clone()),
        );
        let transfer = UnsignedTransfer::from_plan(&TransferPlan {
            from: kp.address(),
            to: Address::from_bytes([2u8; 32]),
            amount_lux: 1,
            reference_point: ReferencePoint("ref-1".to_string()),
        });

        assert!(matches!(
            backend.sign_and_submit(&session, transfer).await,
            Err(BackendError::HandleMismatch)
        ));
    }

    #[test]
    fn marker_param_follows_wallet_name() {
        assert_eq!(
            DeepLinkWallet::default().marker_param(),
            "spectre_encryption_public_key"
        );
    }
}
