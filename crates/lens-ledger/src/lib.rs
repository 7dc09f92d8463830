//! Event admission ledger.
//!
//! Sits between the (external) transport and the decision pipeline:
//! validates symbol format and timestamp plausibility, assigns every event
//! a deterministic content-addressed identity, and enforces at-most-once
//! processing against a durable store. Authenticity verification is the
//! transport's contract; the ledger rejects malformed events regardless of
//! how well they were signed.

pub mod error;
pub mod identity;
pub mod store;
pub mod symbols;

use std::path::Path;

use lens_core::event::SignalEvent;

pub use error::LedgerError;
pub use store::{AdmissionStore, StoredEvent};
pub use symbols::NormalizedSymbol;

/// An event that cleared validation and won admission exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmittedEvent {
    pub event_id: String,
    pub symbol: NormalizedSymbol,
}

#[derive(Debug)]
pub struct Ledger {
    store: AdmissionStore,
}

impl Ledger {
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        Ok(Self {
            store: AdmissionStore::open(path)?,
        })
    }

    pub fn open_in_memory() -> Result<Self, LedgerError> {
        Ok(Self {
            store: AdmissionStore::open_in_memory()?,
        })
    }

    pub fn store(&self) -> &AdmissionStore {
        &self.store
    }

    /// Validate, identify and admit an event.
    ///
    /// Order matters: format and timestamp validation run before the
    /// identity is even computed, so garbage never reaches the store — or
    /// any market-data code. A second submission of the same identity
    /// returns [`LedgerError::Duplicate`] without re-running anything.
    pub fn admit(&self, event: &SignalEvent) -> Result<AdmittedEvent, LedgerError> {
        let symbol = symbols::normalize(&event.symbol)?;
        identity::validate_bar_time(event.bar_time)?;

        let event_id = identity::event_identity(&symbol.display(), event);
        let payload_json = serde_json::to_string(event)?;

        let admitted = self.store.insert_if_absent(&StoredEvent {
            event_id: event_id.clone(),
            bar_time: event.bar_time,
            symbol: symbol.display(),
            event_type: event.event_type.as_str().to_string(),
            payload_json,
        })?;

        if !admitted {
            tracing::debug!(%event_id, "duplicate event ignored");
            return Err(LedgerError::Duplicate(event_id));
        }

        tracing::info!(%event_id, symbol = %symbol, "event admitted");
        Ok(AdmittedEvent { event_id, symbol })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lens_core::event::EventType;

    fn event(symbol: &str) -> SignalEvent {
        SignalEvent {
            symbol: symbol.to_string(),
            timeframe: "30".to_string(),
            bar_time: 1_700_000_000,
            event_type: EventType::SupportTest,
            level: 42_000.5,
            zone_half: 120.0,
            level_score: 1.5,
        }
    }

    #[test]
    fn admits_once_then_reports_duplicate() {
        let ledger = Ledger::open_in_memory().unwrap();
        let first = ledger.admit(&event("BTC/USDT")).unwrap();

        match ledger.admit(&event("BTC/USDT")) {
            Err(LedgerError::Duplicate(id)) => assert_eq!(id, first.event_id),
            other => panic!("expected duplicate, got {other:?}"),
        }
    }

    #[test]
    fn symbol_spellings_share_one_identity() {
        let ledger = Ledger::open_in_memory().unwrap();
        ledger.admit(&event("BTCUSDT")).unwrap();
        assert!(matches!(
            ledger.admit(&event("BTC/USDT")),
            Err(LedgerError::Duplicate(_))
        ));
    }

    #[test]
    fn malformed_symbol_never_reaches_the_store() {
        let ledger = Ledger::open_in_memory().unwrap();
        for bad in ["btc", "TOOLONGSYMBOL123", "BTC1/XYZ"] {
            assert!(
                matches!(ledger.admit(&event(bad)), Err(LedgerError::Validation(_))),
                "expected rejection for {bad:?}"
            );
        }
        assert!(ledger.store().recent_events(None, 10).unwrap().is_empty());
    }

    #[test]
    fn implausible_bar_time_is_rejected() {
        let ledger = Ledger::open_in_memory().unwrap();
        let mut e = event("BTC/USDT");
        e.bar_time = 999; // not a plausible seconds timestamp
        assert!(matches!(
            ledger.admit(&e),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn different_bars_are_different_events() {
        let ledger = Ledger::open_in_memory().unwrap();
        ledger.admit(&event("BTC/USDT")).unwrap();
        let mut e = event("BTC/USDT");
        e.bar_time += 1_800;
        assert!(ledger.admit(&e).is_ok());
    }
}
