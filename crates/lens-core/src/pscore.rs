//! Probability scorer.
//!
//! Fixed-schedule sum of signed factor deltas, starting at a base of 50 and
//! clamped to [0, 100]. Per-factor contributions are preserved for audit
//! instead of collapsing straight to a scalar.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::PScoreConfig;
use crate::levels::{LevelGrade, LevelKind};
use crate::regime::Regime;
use crate::snapshot::OiTier;

/// Scoring inputs, all resolved before this module runs.
#[derive(Debug, Clone, Copy)]
pub struct PScoreInput {
    /// Grade of the local level backing the event.
    pub grade: LevelGrade,
    pub kind: LevelKind,
    pub regime: Regime,
    /// Oscillator at the level; `None` grants no counter-trend bonus.
    pub oscillator: Option<f64>,
    pub oi_tier: OiTier,
    /// Alert-side level score (live scale, see config docs).
    pub event_level_score: f64,
}

/// Result of one scoring pass. Immutable once computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PScoreResult {
    /// Clamped to [0, 100].
    pub value: i32,
    /// Factor name → signed delta, in stable (sorted) order.
    pub contributions: BTreeMap<String, i32>,
    /// Acceptance threshold active for this decision (raised under
    /// COMPRESSION).
    pub threshold_used: i32,
}

impl PScoreResult {
    pub fn accepted(&self) -> bool {
        self.value >= self.threshold_used
    }
}

pub fn calculate(input: &PScoreInput, cfg: &PScoreConfig) -> PScoreResult {
    let threshold_used = match input.regime {
        Regime::Compression => cfg.compression_threshold,
        _ => cfg.base_threshold,
    };

    let mut contributions = BTreeMap::new();
    contributions.insert("base".to_string(), cfg.base);

    // An alert-side ghost score kills the setup outright; the factors are
    // not even consulted.
    if input.event_level_score < cfg.ghost_event_score {
        contributions.insert("ghost_level".to_string(), -cfg.base);
        return PScoreResult {
            value: 0,
            contributions,
            threshold_used,
        };
    }

    let level_delta = match input.grade {
        LevelGrade::Strong => cfg.level_strong_bonus,
        LevelGrade::Medium => 0,
        LevelGrade::Weak => -cfg.level_weak_penalty,
    };
    contributions.insert("level_grade".to_string(), level_delta);

    let regime_delta = match input.regime {
        Regime::Expansion => cfg.regime_expansion_bonus,
        Regime::Compression => -cfg.regime_compression_penalty,
        Regime::Neutral => 0,
    };
    contributions.insert("regime".to_string(), regime_delta);

    // Counter-trend confirmation: oversold at support, overbought at
    // resistance. A missing oscillator simply grants no bonus.
    let osc_delta = match (input.kind, input.oscillator) {
        (LevelKind::Support, Some(osc)) if osc < cfg.osc_oversold => cfg.oscillator_bonus,
        (LevelKind::Resistance, Some(osc)) if osc > cfg.osc_overbought => cfg.oscillator_bonus,
        _ => 0,
    };
    contributions.insert("oscillator".to_string(), osc_delta);

    let sentiment_delta = match input.oi_tier {
        OiTier::Hot => cfg.sentiment_hot_bonus,
        OiTier::Cold => -cfg.sentiment_cold_penalty,
        OiTier::Neutral => 0,
    };
    contributions.insert("sentiment".to_string(), sentiment_delta);

    let raw: i32 = contributions.values().sum();
    PScoreResult {
        value: raw.clamp(0, 100),
        contributions,
        threshold_used,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
