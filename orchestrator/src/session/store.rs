//! # Session Store
//!
//! Durable-across-navigation persistence for exactly one pending round
//! trip: the ephemeral secret plus a tag saying what the round trip was
//! for. This is the only state in the whole system that must survive an
//! uncontrolled page teardown; everything else is rebuildable.
//!
//! The slot is strictly single-occupancy. Starting a second round trip
//! while one is pending fails with [`StoreError::SlotOccupied`] instead of
//! overwriting -- an overwritten secret can never open the first round
//! trip's reply, so the overwrite would be a silent race, and we don't do
//! silent.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{HANDSHAKE_KEY_LENGTH, PENDING_ROUND_TRIP_SLOT};

/// What the pending round trip was started for. Determines how the
/// returning payload is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    Connect,
    Sign,
}

/// The single persisted record: the ephemeral secret that can open the
/// wallet's reply, and the purpose tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRoundTrip {
    pub secret_key: [u8; HANDSHAKE_KEY_LENGTH],
    pub purpose: Purpose,
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// A round trip is already pending. Finish or abandon it first.
    #[error("a wallet round trip is already pending")]
    SlotOccupied,

    /// The stored entry did not decode. The slot is erased when this is
    /// reported; a corrupt secret is useless anyway.
    #[error("stored round-trip entry was corrupt and has been discarded")]
    Corrupt,

    #[error("session storage unavailable: {0}")]
    Unavailable(String),
}

/// One named slot of tab-lifetime storage.
///
/// Implementations serialize the record as JSON under
/// [`PENDING_ROUND_TRIP_SLOT`], which is also the contract with any
/// host-environment binding sitting on real session storage.
pub trait SessionStore: Send + Sync {
    /// Persist a pending round trip. Fails with [`StoreError::SlotOccupied`]
    /// if one is already stored; the existing entry is left intact.
    fn put_pending(&self, entry: &PendingRoundTrip) -> Result<(), StoreError>;

    /// Take the pending entry, erasing it. Exactly-once consumption: a
    /// second call returns `Ok(None)`.
    fn take_pending(&self) -> Result<Option<PendingRoundTrip>, StoreError>;

    /// Erase the slot unconditionally.
    fn clear(&self);
}

/// In-process [`SessionStore`] used by tests and the CLI demo.
///
/// Stores the JSON string rather than the struct so the serialization
/// contract is exercised on every put/take, exactly as a real storage
/// binding would.
#[derive(Default)]
pub struct InMemorySessionStore {
    slot: parking_lot::Mutex<Option<String>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The raw stored string, if any. Test inspection only.
    pub fn raw(&self) -> Option<String> {
        self.slot.lock().clone()
    }
}

impl SessionStore for InMemorySessionStore {
    fn put_pending(&self, entry: &PendingRoundTrip) -> Result<(), StoreError> {
        let mut slot = self.slot.lock();
        if slot.is_some() {
            return Err(StoreError::SlotOccupied);
        }
        let json = serde_json::to_string(entry)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        tracing::debug!(key = PENDING_ROUND_TRIP_SLOT, purpose = ?entry.purpose, "persisting pending round trip");
        *slot = Some(json);
        Ok(())
    }

    fn take_pending(&self) -> Result<Option<PendingRoundTrip>, StoreError> {
        let taken = self.slot.lock().take();
        match taken {
            None => Ok(None),
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|_| StoreError::Corrupt),
        }
    }

    fn clear(&self) {
        *self.slot.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(purpose: Purpose) -> PendingRoundTrip {
        PendingRoundTrip {
            secret_key: [7u8; HANDSHAKE_KEY_LENGTH],
            purpose,
        }
    }

    #[test]
    fn put_take_roundtrip() {
        let store = InMemorySessionStore::new();
        store.put_pending(&entry(Purpose::Connect)).unwrap();

        let taken = store.take_pending().unwrap().unwrap();
        assert_eq!(taken, entry(Purpose::Connect));
    }

    #[test]
    fn take_is_exactly_once() {
        let store = InMemorySessionStore::new();
        store.put_pending(&entry(Purpose::Sign)).unwrap();

        assert!(store.take_pending().unwrap().is_some());
        assert!(store.take_pending().unwrap().is_none());
    }

    #[test]
    fn second_put_rejected_first_entry_intact() {
        let store = InMemorySessionStore::new();
        store.put_pending(&entry(Purpose::Connect)).unwrap();

        let second = PendingRoundTrip {
            secret_key: [9u8; HANDSHAKE_KEY_LENGTH],
            purpose: Purpose::Sign,
        };
        assert!(matches!(
            store.put_pending(&second),
            Err(StoreError::SlotOccupied)
        ));

        // The original entry survived the rejected attempt.
        let taken = store.take_pending().unwrap().unwrap();
        assert_eq!(taken, entry(Purpose::Connect));
    }

    #[test]
    fn clear_then_put_succeeds() {
        let store = InMemorySessionStore::new();
        store.put_pending(&entry(Purpose::Connect)).unwrap();
        store.clear();
        assert!(store.put_pending(&entry(Purpose::Sign)).is_ok());
    }

    #[test]
    fn corrupt_slot_is_reported_and_erased() {
        let store = InMemorySessionStore::new();
        *store.slot.lock() = Some("not json".to_string());

        assert!(matches!(store.take_pending(), Err(StoreError::Corrupt)));
        // Erased by the failed take: the slot is free again.
        assert!(store.take_pending().unwrap().is_none());
    }

    #[test]
    fn stored_form_is_json_under_the_slot_key() {
        let store = InMemorySessionStore::new();
        store.put_pending(&entry(Purpose::Sign)).unwrap();
        let raw = store.raw().unwrap();
        assert!(raw.contains("\"purpose\":\"sign\""));
    }
}
