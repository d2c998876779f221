//! # Wallet Picker Overlay
//!
//! A generic wallet-discovery overlay library, consumed strictly at its
//! interface: a heavy one-time initialization, a fire-and-forget picker,
//! and a stream of loosely shaped `connect`/`disconnect` events. We never
//! depend on its internals, and we never assume its event objects beyond
//! the handful of fields different overlay versions have been seen to use.

use serde_json::Value;
use std::sync::Arc;
use std::sync::Once;

use crate::ledger::Address;

/// The overlay library's own surface.
pub trait OverlayDriver: Send + Sync {
    /// The expensive one-time setup. Must only ever run once per process;
    /// [`Overlay::ensure_initialized`] enforces that.
    fn initialize(&self);

    /// Show the picker. No return value: the outcome, if any, arrives as
    /// an ambient event.
    fn show_picker(&self);
}

/// Initialization-guarded handle to the overlay.
///
/// The guard is explicit and idempotent: every public entry point funnels
/// through [`ensure_initialized`], so callers never have to know whether
/// somebody else already paid the setup cost.
///
/// [`ensure_initialized`]: Overlay::ensure_initialized
pub struct Overlay {
    driver: Arc<dyn OverlayDriver>,
    init: Once,
}

impl Overlay {
    pub fn new(driver: Arc<dyn OverlayDriver>) -> Self {
        Self {
            driver,
            init: Once::new(),
        }
    }

    /// Initialize the overlay if nothing has yet. Safe to call from
    /// anywhere, any number of times.
    pub fn ensure_initialized(&self) {
        self.init.call_once(|| {
            tracing::debug!("initializing wallet overlay");
            self.driver.initialize();
        });
    }

    pub fn show_picker(&self) {
        self.ensure_initialized();
        self.driver.show_picker();
    }
}

/// An inbound overlay event, reduced to the two names we care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayEvent {
    Connect { address: Address },
    Disconnect,
}

impl OverlayEvent {
    /// Parse a named event and its JSON detail.
    ///
    /// Overlay versions disagree on where the address lives, so `connect`
    /// tries `address`, then `accounts[0]`, then `publicKey`. Anything
    /// else, or an address that doesn't parse, is `None` -- unknown events
    /// are ignored, not errors.
    pub fn parse(name: &str, detail: &Value) -> Option<Self> {
        match name {
            "disconnect" => Some(OverlayEvent::Disconnect),
            "connect" => {
                let raw = detail
                    .get("address")
                    .and_then(Value::as_str)
                    .or_else(|| detail.get("accounts").and_then(|a| a.get(0)).and_then(Value::as_str))
                    .or_else(|| detail.get("publicKey").and_then(Value::as_str))?;
                let address = Address::parse(raw).ok()?;
                Some(OverlayEvent::Connect { address })
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingDriver {
        inits: AtomicUsize,
        picks: AtomicUsize,
    }

    impl OverlayDriver for CountingDriver {
        fn initialize(&self) {
            self.inits.fetch_add(1, Ordering::SeqCst);
        }
        fn show_picker(&self) {
            self.picks.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn initialization_runs_exactly_once() {
        let driver = Arc::new(CountingDriver::default());
        let overlay = Overlay::new(driver.clone());

        overlay.ensure_initialized();
        overlay.ensure_initialized();
        overlay.show_picker();

        assert_eq!(driver.inits.load(Ordering::SeqCst), 1);
        assert_eq!(driver.picks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn show_picker_initializes_first() {
        let driver = Arc::new(CountingDriver::default());
        let overlay = Overlay::new(driver.clone());

        overlay.show_picker();
        assert_eq!(driver.inits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn connect_address_fallback_chain() {
        let addr = Address::from_bytes([5u8; 32]);
        let b58 = addr.to_string();

        for detail in [
            json!({ "address": b58 }),
            json!({ "accounts": [b58] }),
            json!({ "publicKey": b58 }),
        ] {
            assert_eq!(
                OverlayEvent::parse("connect", &detail),
                Some(OverlayEvent::Connect { address: addr })
            );
        }
    }

    #[test]
    fn fallback_order_prefers_address() {
        let first = Address::from_bytes([1u8; 32]);
        let second = Address::from_bytes([2u8; 32]);
        let detail = json!({
            "address": first.to_string(),
            "accounts": [second.to_string()],
        });
        assert_eq!(
            OverlayEvent::parse("connect", &detail),
            Some(OverlayEvent::Connect { address: first })
        );
    }

    #[test]
    fn unknown_or_unparseable_events_are_ignored() {
        assert_eq!(OverlayEvent::parse("themeChanged", &json!({})), None);
        assert_eq!(OverlayEvent::parse("connect", &json!({})), None);
        assert_eq!(
            OverlayEvent::parse("connect", &json!({ "address": "not-base58-0OIl" })),
            None
        );
    }

    #[test]
    fn disconnect_needs_no_detail() {
        assert_eq!(
            OverlayEvent::parse("disconnect", &json!(null)),
            Some(OverlayEvent::Disconnect)
        );
    }
}
