//! Symbol normalization and strict format validation.
//!
//! Accepted input forms: `BTC`, `BTCUSDT`, `BTC/USDT`, `BTC-USDT`,
//! `BTC_USDT`. The base must already satisfy `^[A-Z0-9]{2,10}$` — there is
//! no case folding; a lowercase ticker is a malformed ticker. The quote
//! must come from the explicit allow-list. Everything here runs before any
//! market-data lookup.

use std::fmt;

use crate::error::LedgerError;

const DEFAULT_QUOTE: &str = "USDT";
const ALLOWED_QUOTES: [&str; 6] = ["USDT", "USDC", "BUSD", "FDUSD", "DAI", "EUR"];

const BASE_MIN: usize = 2;
const BASE_MAX: usize = 10;

/// Canonical base/quote pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedSymbol {
    pub base: String,
    pub quote: String,
}

impl NormalizedSymbol {
    /// Display form, also the form hashed into event identities.
    pub fn display(&self) -> String {
        format!("{}/{}", self.base, self.quote)
    }

    /// Concatenated venue form (`BTCUSDT`).
    pub fn pair(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }
}

impl fmt::Display for NormalizedSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

pub fn normalize(symbol: &str) -> Result<NormalizedSymbol, LedgerError> {
    let s: String = symbol
        .trim()
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .collect();
    if s.is_empty() {
        return Err(LedgerError::Validation("empty symbol".to_string()));
    }

    let (base, quote) = if let Some((b, q)) = s.split_once('/') {
        if b.is_empty() || q.is_empty() || q.contains('/') {
            return Err(LedgerError::Validation(format!(
                "invalid pair format: {symbol:?}"
            )));
        }
        (b.to_string(), q.to_string())
    } else if let Some(q) = ALLOWED_QUOTES
        .iter()
        .find(|q| s.ends_with(*q) && s.len() > q.len())
    {
        (s[..s.len() - q.len()].to_string(), (*q).to_string())
    } else {
        (s, DEFAULT_QUOTE.to_string())
    };

    if base.len() < BASE_MIN || base.len() > BASE_MAX {
        return Err(LedgerError::Validation(format!(
            "base symbol length {} outside [{BASE_MIN}, {BASE_MAX}]: {base:?}",
            base.len()
        )));
    }
    if !base
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return Err(LedgerError::Validation(format!(
            "base symbol must match ^[A-Z0-9]{{{BASE_MIN},{BASE_MAX}}}$: {base:?}"
        )));
    }
    if !ALLOWED_QUOTES.contains(&quote.as_str()) {
        return Err(LedgerError::Validation(format!(
            "quote {quote:?} not in allow-list"
        )));
    }

    Ok(NormalizedSymbol { base, quote })
}
