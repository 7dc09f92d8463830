//! Durable admitted-identities store.
//!
//! The at-most-once guarantee rides on SQLite's UNIQUE constraint: a single
//! `INSERT OR IGNORE` is the atomic check-and-insert, so no two concurrent
//! writers can both win admission for one identity. The connection sits
//! behind a mutex; decision cycles for different identities only contend
//! for the duration of one insert.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection};

use crate::error::LedgerError;

#[derive(Debug)]
pub struct AdmissionStore {
    conn: Mutex<Connection>,
}

/// Stored event row, as persisted at admission time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEvent {
    pub event_id: String,
    pub bar_time: i64,
    pub symbol: String,
    pub event_type: String,
    pub payload_json: String,
}

impl AdmissionStore {
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        Self::from_conn(Connection::open(path)?)
    }

    /// Volatile store for tests and dry runs.
    pub fn open_in_memory() -> Result<Self, LedgerError> {
        Self::from_conn(Connection::open_in_memory()?)
    }

    fn from_conn(conn: Connection) -> Result<Self, LedgerError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS events (
                 id            INTEGER PRIMARY KEY AUTOINCREMENT,
                 event_id      TEXT UNIQUE NOT NULL,
                 bar_time      INTEGER NOT NULL,
                 symbol        TEXT NOT NULL,
                 event_type    TEXT NOT NULL,
                 payload_json  TEXT NOT NULL,
                 created_at    TIMESTAMP DEFAULT CURRENT_TIMESTAMP
             );
             CREATE INDEX IF NOT EXISTS idx_events_bar_time ON events(bar_time);
             CREATE INDEX IF NOT EXISTS idx_events_symbol ON events(symbol);",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Atomic insert-if-absent. Returns `true` when this call won admission
    /// for the identity, `false` when it was already present.
    pub fn insert_if_absent(&self, row: &StoredEvent) -> Result<bool, LedgerError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| LedgerError::Storage("admission store mutex poisoned".to_string()))?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO events (event_id, bar_time, symbol, event_type, payload_json)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                row.event_id,
                row.bar_time,
                row.symbol,
                row.event_type,
                row.payload_json
            ],
        )?;
        Ok(inserted == 1)
    }

    /// Recent admitted events, newest first, optionally for one symbol.
    pub fn recent_events(
        &self,
        symbol: Option<&str>,
        limit: u32,
    ) -> Result<Vec<StoredEvent>, LedgerError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| LedgerError::Storage("admission store mutex poisoned".to_string()))?;

        let map_row = |row: &rusqlite::Row<'_>| {
            Ok(StoredEvent {
                event_id: row.get(0)?,
                bar_time: row.get(1)?,
                symbol: row.get(2)?,
                event_type: row.get(3)?,
                payload_json: row.get(4)?,
            })
        };

        let rows = match symbol {
            Some(sym) => {
                let mut stmt = conn.prepare(
                    "SELECT event_id, bar_time, symbol, event_type, payload_json
                     FROM events WHERE symbol = ?1
                     ORDER BY bar_time DESC, id DESC LIMIT ?2",
                )?;
                let rows = stmt.query_map(params![sym, limit], map_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT event_id, bar_time, symbol, event_type, payload_json
                     FROM events ORDER BY bar_time DESC, id DESC LIMIT ?1",
                )?;
                let rows = stmt.query_map(params![limit], map_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, bar_time: i64, symbol: &str) -> StoredEvent {
        StoredEvent {
            event_id: id.to_string(),
            bar_time,
            symbol: symbol.to_string(),
            event_type: "SUPPORT_TEST".to_string(),
            payload_json: "{}".to_string(),
        }
    }

    #[test]
    fn first_insert_wins_second_loses() {
        let store = AdmissionStore::open_in_memory().unwrap();
        assert!(store.insert_if_absent(&row("abc", 1_700_000_000, "BTC/USDT")).unwrap());
        assert!(!store.insert_if_absent(&row("abc", 1_700_000_000, "BTC/USDT")).unwrap());
    }

    #[test]
    fn distinct_identities_both_win() {
        let store = AdmissionStore::open_in_memory().unwrap();
        assert!(store.insert_if_absent(&row("abc", 1, "BTC/USDT")).unwrap());
        assert!(store.insert_if_absent(&row("def", 2, "ETH/USDT")).unwrap());
    }

    #[test]
    fn recent_events_filters_by_symbol() {
        let store = AdmissionStore::open_in_memory().unwrap();
        store.insert_if_absent(&row("a", 10, "BTC/USDT")).unwrap();
        store.insert_if_absent(&row("b", 20, "ETH/USDT")).unwrap();
        store.insert_if_absent(&row("c", 30, "BTC/USDT")).unwrap();

        let btc = store.recent_events(Some("BTC/USDT"), 50).unwrap();
        assert_eq!(btc.len(), 2);
        assert_eq!(btc[0].event_id, "c"); // newest first

        let all = store.recent_events(None, 2).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].event_id, "c");
    }
}
