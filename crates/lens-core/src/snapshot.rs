//! Immutable market-data snapshot consumed by one decision cycle.
//!
//! The snapshot is assembled by the data-acquisition collaborator before the
//! pipeline runs and is never re-fetched or mutated mid-computation; that is
//! what makes decisions reproducible even while live data moves.

use serde::{Deserialize, Serialize};

use crate::candle::Candle;
use crate::config::PipelineConfig;
use crate::error::CoreError;
use crate::indicators::atr::AtrIndicator;
use crate::indicators::roc::roc_series;
use crate::indicators::rsi::RsiIndicator;
use crate::indicators::vwap::rolling_vwap;

/// Open-interest tier as classified by the sentiment collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OiTier {
    Hot,
    Cold,
    #[default]
    Neutral,
}

/// Everything one decision cycle is allowed to look at.
///
/// Optional fields are genuinely optional upstream (a venue may not serve
/// funding or an oscillator); consumers must fail closed on `None`, never
/// substitute a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub price: f64,
    /// ATR(14) on the analysis timeframe.
    pub atr: f64,
    pub vwap: Option<f64>,
    /// Bounded 0–100 momentum oscillator (RSI-like).
    pub oscillator: Option<f64>,
    /// Fractional funding rate (0.0003 = 0.03%).
    pub funding_rate: Option<f64>,
    pub oi_tier: OiTier,
    /// Target-symbol candle series, fixed timeframe, oldest first.
    pub candles: Vec<Candle>,
    /// Reference-asset rate-of-change series for regime classification.
    pub reference_roc: Vec<f64>,
    /// Close time of the snapshot (ms). All record timestamps derive from
    /// this, never from the wall clock.
    pub taken_at_ms: i64,
}

impl MarketSnapshot {
    /// Assemble a snapshot from raw series, deriving price, ATR, oscillator,
    /// VWAP and the reference ROC the way the acquisition layer would.
    pub fn from_series(
        candles: Vec<Candle>,
        reference_closes: &[f64],
        funding_rate: Option<f64>,
        oi_tier: OiTier,
        cfg: &PipelineConfig,
    ) -> Result<Self, CoreError> {
        let last = candles.last().ok_or_else(|| {
            CoreError::DataIntegrity("cannot build snapshot from empty candle series".into())
        })?;

        let mut atr = AtrIndicator::new(cfg.levels.atr_window);
        let mut rsi = RsiIndicator::new(cfg.levels.atr_window);
        for c in &candles {
            atr.update(c.h, c.l, c.c);
            rsi.update(c.c);
        }

        let vwap_window = (24 * 60 / cfg.engine.timeframe_minutes) as usize;
        let vwap = rolling_vwap(&candles, vwap_window.max(1));
        let oscillator = rsi.is_warm().then_some(rsi.value);

        Ok(Self {
            price: last.c,
            atr: atr.value(),
            vwap,
            oscillator,
            funding_rate,
            oi_tier,
            reference_roc: roc_series(reference_closes, cfg.regime.roc_period),
            taken_at_ms: last.t + cfg.engine.timeframe_ms(),
            candles,
        })
    }

    /// Return of the last `lookback` bars: `close[n] / close[n - lookback] - 1`.
    /// `None` when the series is too short — the caller decides what failing
    /// closed means for it.
    pub fn trailing_return(&self, lookback: usize) -> Option<f64> {
        let n = self.candles.len();
        if n <= lookback {
            return None;
        }
        let base = self.candles[n - 1 - lookback].c;
        if base <= 0.0 {
            return None;
        }
        Some(self.candles[n - 1].c / base - 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TF: i64 = 30 * 60 * 1000;

    fn candles(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle {
                t: i as i64 * TF,
                o: c,
                h: c + 1.0,
                l: c - 1.0,
                c,
                v: 1_000.0,
            })
            .collect()
    }

    #[test]
    fn from_series_derives_price_and_timestamps() {
        let cfg = PipelineConfig::default();
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64 * 0.1).collect();
        let snap =
            MarketSnapshot::from_series(candles(&closes), &closes, Some(0.0001), OiTier::Neutral, &cfg)
                .unwrap();

        assert!((snap.price - closes[59]).abs() < 1e-12);
        assert!(snap.atr > 0.0);
        assert!(snap.vwap.is_some());
        assert!(snap.oscillator.is_some());
        assert_eq!(snap.taken_at_ms, 59 * TF + TF);
    }

    #[test]
    fn trailing_return_needs_enough_bars() {
        let cfg = PipelineConfig::default();
        let closes = [100.0, 101.0, 102.0, 103.0, 104.0, 95.0];
        let snap =
            MarketSnapshot::from_series(candles(&closes), &closes, None, OiTier::Neutral, &cfg)
                .unwrap();

        let ret = snap.trailing_return(5).unwrap();
        assert!((ret - (95.0 / 100.0 - 1.0)).abs() < 1e-12);
        assert!(snap.trailing_return(6).is_none());
    }
}
