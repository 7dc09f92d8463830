use std::fmt;

/// Admission-side error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Malformed symbol or implausible timestamp. Rejected before any
    /// market-data lookup; resolves to a NO_TRADE record upstream.
    Validation(String),
    /// Identity already admitted. Carries the event id so callers can
    /// report "duplicate, not reprocessed" without recomputing anything.
    Duplicate(String),
    /// SQLite / serialization failure in the durable store.
    Storage(String),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(msg) => write!(f, "validation: {msg}"),
            Self::Duplicate(id) => write!(f, "duplicate_event: {id}"),
            Self::Storage(msg) => write!(f, "storage: {msg}"),
        }
    }
}

impl std::error::Error for LedgerError {}

impl From<rusqlite::Error> for LedgerError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        Self::Storage(e.to_string())
    }
}
