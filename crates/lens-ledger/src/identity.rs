//! Deterministic event identity.
//!
//! Content-addressed SHA-256 over a fixed field order with `|` separators;
//! floats are normalized to 8 decimals so the digest survives float
//! formatting drift across producers. The scheme is stable by contract —
//! changing it orphans every previously admitted identity.

use sha2::{Digest, Sha256};

use lens_core::event::SignalEvent;

use crate::error::LedgerError;

/// 2020-01-01T00:00:00Z. Earlier bar times are implausible by contract.
pub const MIN_BAR_TIME: i64 = 1_577_836_800;

/// Compute the identity digest for an event.
///
/// `canonical_symbol` is the normalized display form (`BTC/USDT`), so that
/// every accepted spelling of a symbol maps to the same identity.
pub fn event_identity(canonical_symbol: &str, event: &SignalEvent) -> String {
    let raw = format!(
        "{}|{}|{}|{}|{:.8}|{:.8}",
        canonical_symbol,
        event.timeframe,
        event.bar_time,
        event.event_type.as_str(),
        event.level,
        event.zone_half,
    );
    let digest = Sha256::digest(raw.as_bytes());
    let mut out = String::with_capacity(64);
    for b in digest {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// Reject bar times that cannot be real (wrong unit, zero, pre-2020).
pub fn validate_bar_time(bar_time: i64) -> Result<(), LedgerError> {
    if bar_time <= MIN_BAR_TIME {
        return Err(LedgerError::Validation(format!(
            "bar_time {bar_time} must be a Unix timestamp in seconds after {MIN_BAR_TIME}"
        )));
    }
    Ok(())
}
