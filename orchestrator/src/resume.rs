//! # Redirect Resumption
//!
//! The other half of the deep-link coroutine. A round trip suspends by
//! persisting its ephemeral secret and navigating away; this module runs
//! once per page load, notices a wallet return in the URL, and completes
//! the exchange: take the stored secret, derive the shared key, open the
//! payload, hand the decoded result to the orchestrator.
//!
//! Two unconditional cleanups happen the moment a wallet return is
//! detected, before the payload is even looked at:
//!
//! - the store slot is erased (take-once, success or failure), and
//! - the visible URL is rewritten to its clean form,
//!
//! so reloading the page can never replay a consumed round trip. A decode
//! failure is terminal for that round trip; the secret that could have
//! opened it is already gone, and nothing here retries.

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::backend::DeepLinkWallet;
use crate::browser::Browser;
use crate::crypto::handshake::{EphemeralHandshake, HandshakeError, RoundTripPayload};
use crate::session::{Purpose, SessionStore, StoreError};

/// A completed round trip: the stored purpose plus the opened payload.
/// The orchestrator decides what the combination means.
#[derive(Debug)]
pub struct ResumedRoundTrip {
    pub purpose: Purpose,
    pub payload: RoundTripPayload,
}

#[derive(Debug, Error)]
pub enum ResumeError {
    /// The return URL is recognizably a wallet return but a required
    /// parameter is missing or not valid base58.
    #[error("wallet return URL is missing or mangles its `{0}` parameter")]
    MalformedReturn(&'static str),

    #[error(transparent)]
    Handshake(#[from] HandshakeError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// See module docs.
pub struct Resumption {
    browser: Arc<dyn Browser>,
    store: Arc<dyn SessionStore>,
    wallet: DeepLinkWallet,
}

impl Resumption {
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

    /// Inspect the current URL and, if it carries a wallet return, complete
    /// the round trip. `Ok(None)` covers both the plain page load and a
    /// stale return whose round trip was already consumed.
    pub fn run(&self) -> Result<Option<ResumedRoundTrip>, ResumeError> {
        let url = self.browser.current_url();
        let params: HashMap<String, String> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        let marker = self.wallet.marker_param();
        let Some(remote_b58) = params.get(&marker) else {
            return Ok(None);
        };
        tracing::info!(wallet = %self.wallet.name, "wallet return detected");

        // Cleanups first. Whatever happens below, this URL is spent.
        let mut clean = url.clone();
        clean.set_query(None);
        clean.set_fragment(None);
        self.browser.replace_url(&clean);

        let entry = self.store.take_pending()?;
        let Some(entry) = entry else {
            tracing::warn!("wallet return with no pending round trip, ignoring");
            return Ok(None);
        };

        let remote = bs58::decode(remote_b58)
            .into_vec()
            .map_err(|_| ResumeError::MalformedReturn("encryption_public_key"))?;
        let nonce = decode_param(&params, "nonce")?;
        let data = decode_param(&params, "data")?;

        let handshake = EphemeralHandshake::from_secret_bytes(entry.secret_key);
        let session_key = handshake.derive_shared_key(&remote)?;
        let payload = RoundTripPayload::open(&session_key, &nonce, &data)?;

        Ok(Some(ResumedRoundTrip {
            purpose: entry.purpose,
            payload,
        }))
    }
}

fn decode_param(
    params: &HashMap<String, String>,
    name: &'static str,
) -> Result<Vec<u8>, ResumeError> {
    let value = params.get(name).ok_or(ResumeError::MalformedReturn(name))?;
    bs58::decode(value)
        .into_vec()
        .map_err(|_| ResumeError::MalformedReturn(name))
}
