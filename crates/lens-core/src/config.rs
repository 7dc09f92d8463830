//! Pipeline configuration.
//!
//! Every threshold the pipeline consults lives here as an immutable snapshot,
//! injected once and never re-read mid-cycle. Defaults are the production
//! values; a YAML overlay may override any subset. `validate()` runs at
//! startup and is fatal on failure — the pipeline must never run with a
//! half-broken config.

use serde::Deserialize;
use std::path::Path;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fixed candle timeframe in minutes. The pipeline analyses one
    /// timeframe only; mixed series are rejected.
    pub timeframe_minutes: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeframe_minutes: 30,
        }
    }
}

impl EngineConfig {
    pub fn timeframe_ms(&self) -> i64 {
        i64::from(self.timeframe_minutes) * 60_000
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    /// Symmetric pivot window: N bars on each side.
    pub pivot_window: usize,
    /// Bars to wait before judging whether price reacted away from a pivot.
    pub react_bars: usize,
    /// Reaction distance as a multiple of the pivot-bar ATR.
    pub react_factor: f64,
    /// Pivots closer than `merge_factor * ATR` collapse into one level.
    pub merge_factor: f64,
    /// ATR lookback used for reaction/merge distances.
    pub atr_window: usize,
    /// Score weights: `touch_weight * touches - age_weight * age_bars`.
    pub touch_weight: f64,
    pub age_weight: f64,
    /// Levels scoring below this are "ghosts": kept for proximity math,
    /// excluded from trade candidacy.
    pub ghost_threshold: f64,
    /// Candidate levels further than this from the current price (in %)
    /// are not considered tradeable.
    pub max_distance_pct: f64,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            pivot_window: 4,
            react_bars: 24,
            react_factor: 1.0,
            merge_factor: 0.6,
            atr_window: 14,
            touch_weight: 1.0,
            age_weight: 0.15,
            ghost_threshold: -10.0,
            max_distance_pct: 30.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegimeConfig {
    /// Rolling z-score window over the reference-asset ROC series.
    pub z_window: usize,
    /// Minimum samples before a classification is trusted at all.
    pub min_samples: usize,
    /// |z| beyond this flips the regime out of NEUTRAL.
    pub z_threshold: f64,
    /// ROC lookback (periods) for `roc_series`.
    pub roc_period: usize,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            z_window: 180,
            min_samples: 180,
            z_threshold: 1.25,
            roc_period: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PScoreConfig {
    pub base: i32,
    pub level_strong_bonus: i32,
    pub level_weak_penalty: i32,
    pub regime_expansion_bonus: i32,
    pub regime_compression_penalty: i32,
    pub oscillator_bonus: i32,
    pub sentiment_hot_bonus: i32,
    pub sentiment_cold_penalty: i32,
    /// Oscillator extremes that count as counter-trend confirmation.
    pub osc_oversold: f64,
    pub osc_overbought: f64,
    /// Acceptance thresholds; COMPRESSION uses the raised one.
    pub base_threshold: i32,
    pub compression_threshold: i32,
    /// Alert-side level scores below this force the score to zero.
    /// This is the live (alert) scale, not the local level-book scale.
    pub ghost_event_score: f64,
}

impl Default for PScoreConfig {
    fn default() -> Self {
        Self {
            base: 50,
            level_strong_bonus: 15,
            level_weak_penalty: 20,
            regime_expansion_bonus: 10,
            regime_compression_penalty: 10,
            oscillator_bonus: 5,
            sentiment_hot_bonus: 10,
            sentiment_cold_penalty: 5,
            osc_oversold: 35.0,
            osc_overbought: 65.0,
            base_threshold: 35,
            compression_threshold: 40,
            ghost_event_score: -10.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KevlarConfig {
    /// Max |price - level| / price before the entry is considered missed.
    pub max_level_distance: f64,
    /// Bars for the momentum (falling knife / short squeeze) lookback.
    pub momentum_lookback: usize,
    /// 5-bar return below -this blocks longs at support.
    pub crash_return: f64,
    /// 5-bar return above +this blocks shorts at resistance.
    pub squeeze_return: f64,
    /// Oscillator panic/FOMO band edges.
    pub osc_panic: f64,
    pub osc_fomo: f64,
    /// Oscillator extremes only block when the score sits below this.
    pub panic_score_floor: i32,
    /// Funding-rate trap thresholds (fractional, 0.0003 = 0.03%).
    pub long_trap_funding: f64,
    pub short_trap_funding: f64,
    /// Anti-trap proximity to an opposing STRONG level (fractional).
    pub anti_trap_distance: f64,
}

impl Default for KevlarConfig {
    fn default() -> Self {
        Self {
            max_level_distance: 0.15,
            momentum_lookback: 5,
            crash_return: 0.05,
            squeeze_return: 0.05,
            osc_panic: 20.0,
            osc_fomo: 80.0,
            panic_score_floor: 50,
            long_trap_funding: 0.0003,
            short_trap_funding: -0.0003,
            anti_trap_distance: 0.003,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrderConfig {
    /// ATR multiples for the stop and the three targets.
    pub stop_atr: f64,
    pub tp1_atr: f64,
    pub tp2_atr: f64,
    pub tp3_atr: f64,
    /// Plans with RRR (vs TP2) below this are blocked.
    pub min_rrr: f64,
    /// Overheated funding demands a better RRR.
    pub funding_cap: f64,
    pub funding_rrr_floor: f64,
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self {
            stop_atr: 1.0,
            tp1_atr: 0.75,
            tp2_atr: 1.25,
            tp3_atr: 2.0,
            min_rrr: 1.10,
            funding_cap: 0.005,
            funding_rrr_floor: 1.30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Account equity the risk fraction is applied to.
    pub capital: f64,
    /// Fraction of capital risked per trade (0.01 = 1%).
    pub risk_fraction: f64,
    /// Optional exchange lot step; size is floored to it when set.
    pub lot_step: Option<f64>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            capital: 1_000.0,
            risk_fraction: 0.01,
            lot_step: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Top level
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub engine: EngineConfig,
    pub levels: LevelConfig,
    pub regime: RegimeConfig,
    pub pscore: PScoreConfig,
    pub kevlar: KevlarConfig,
    pub order: OrderConfig,
    pub risk: RiskConfig,
}

impl PipelineConfig {
    /// Load a YAML overlay on top of the defaults.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(path)?;
        let cfg: Self = serde_yaml::from_str(&raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject configurations the pipeline must never run with.
    pub fn validate(&self) -> Result<(), CoreError> {
        let fail = |msg: String| Err(CoreError::Configuration(msg));

        if self.engine.timeframe_minutes == 0 {
            return fail("engine.timeframe_minutes must be > 0".into());
        }
        if self.levels.pivot_window == 0 {
            return fail("levels.pivot_window must be > 0".into());
        }
        if self.levels.merge_factor <= 0.0 || self.levels.react_factor <= 0.0 {
            return fail("levels.merge_factor and react_factor must be > 0".into());
        }
        if self.regime.z_window == 0 || self.regime.min_samples == 0 {
            return fail("regime windows must be > 0".into());
        }
        if self.regime.min_samples > self.regime.z_window {
            return fail(format!(
                "regime.min_samples ({}) exceeds z_window ({})",
                self.regime.min_samples, self.regime.z_window
            ));
        }
        if self.regime.z_threshold <= 0.0 {
            return fail("regime.z_threshold must be > 0".into());
        }
        if self.pscore.base_threshold > self.pscore.compression_threshold {
            return fail(format!(
                "pscore.base_threshold ({}) exceeds compression_threshold ({})",
                self.pscore.base_threshold, self.pscore.compression_threshold
            ));
        }
        if !(0.0..=1.0).contains(&self.kevlar.max_level_distance) {
            return fail("kevlar.max_level_distance must be within [0, 1]".into());
        }
        if self.kevlar.momentum_lookback == 0 {
            return fail("kevlar.momentum_lookback must be > 0".into());
        }
        if self.order.stop_atr <= 0.0 {
            return fail("order.stop_atr must be > 0".into());
        }
        if self.order.min_rrr < 1.0 {
            return fail(format!("order.min_rrr {} < 1.0", self.order.min_rrr));
        }
        if self.risk.capital <= 0.0 {
            return fail(format!("risk.capital {} must be > 0", self.risk.capital));
        }
        if self.risk.risk_fraction <= 0.0 || self.risk.risk_fraction >= 1.0 {
            return fail(format!(
                "risk.risk_fraction {} must be in (0, 1)",
                self.risk.risk_fraction
            ));
        }
        if let Some(step) = self.risk.lot_step {
            if step <= 0.0 {
                return fail(format!("risk.lot_step {step} must be > 0"));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
