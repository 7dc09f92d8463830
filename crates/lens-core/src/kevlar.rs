//! Safety cascade ("Kevlar") — ordered, short-circuiting boolean gates.
//!
//! Each gate consumes the market snapshot, the active P-Score and the
//! candidate level, and records the inputs it used alongside its verdict.
//! Once a gate fails, later gates are *not* evaluated and are absent from
//! the result — absence means "not evaluated", which is itself meaningful
//! for the audit trail. A gate that cannot evaluate because an input is
//! missing fails closed.

use serde::Serialize;

use crate::config::KevlarConfig;
use crate::event::Side;
use crate::levels::{LevelBook, LevelKind};
use crate::pscore::PScoreResult;
use crate::snapshot::MarketSnapshot;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    /// Stage 0: score below the active acceptance threshold.
    PScoreThreshold,
    DataIntegrity,
    LevelDistance,
    FallingKnife,
    ShortSqueeze,
    OscillatorExtreme,
    SentimentTrap,
    /// Post-direction check against opposing STRONG levels.
    AntiTrap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateOutcome {
    pub gate: Gate,
    pub passed: bool,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KevlarVerdict {
    pub passed: bool,
    pub first_failing_gate: Option<Gate>,
    /// Outcomes in evaluation order, up to and including the first failure.
    pub gates: Vec<GateOutcome>,
}

/// Everything the cascade is allowed to look at.
pub struct CascadeInput<'a> {
    pub side: Side,
    pub kind: LevelKind,
    /// Planned entry (the event's level price).
    pub event_level: f64,
    pub p_score: &'a PScoreResult,
    pub snap: &'a MarketSnapshot,
    pub book: &'a LevelBook,
}

// ---------------------------------------------------------------------------
// Cascade
// ---------------------------------------------------------------------------

pub fn run_cascade(inp: &CascadeInput<'_>, cfg: &KevlarConfig) -> KevlarVerdict {
    let mut gates: Vec<GateOutcome> = Vec::with_capacity(8);

    macro_rules! gate {
        ($gate:expr, $passed:expr, $detail:expr) => {{
            let passed = $passed;
            gates.push(GateOutcome {
                gate: $gate,
                passed,
                detail: $detail,
            });
            if !passed {
                tracing::info!(gate = ?$gate, "kevlar blocked");
                return KevlarVerdict {
                    passed: false,
                    first_failing_gate: Some($gate),
                    gates,
                };
            }
        }};
    }

    let snap = inp.snap;
    let p = inp.p_score;

    // ── Stage 0: P-Score threshold ──────────────────────────────────────
    gate!(
        Gate::PScoreThreshold,
        p.accepted(),
        format!("score {} vs threshold {}", p.value, p.threshold_used)
    );

    // ── Gate 1: data integrity ──────────────────────────────────────────
    gate!(
        Gate::DataIntegrity,
        snap.atr > 0.0 && snap.price > 0.0 && snap.candles.len() >= crate::candle::MIN_CANDLES,
        format!(
            "atr={:.8} price={:.8} candles={}",
            snap.atr,
            snap.price,
            snap.candles.len()
        )
    );

    // ── Gate 2: level distance ──────────────────────────────────────────
    let distance = (snap.price - inp.event_level).abs() / snap.price;
    gate!(
        Gate::LevelDistance,
        distance <= cfg.max_level_distance,
        format!(
            "|{:.8} - {:.8}| / price = {distance:.6} (max {:.4})",
            snap.price, inp.event_level, cfg.max_level_distance
        )
    );

    // ── Gate 3: falling knife (support only) ────────────────────────────
    let (passed, detail) = if inp.kind == LevelKind::Support {
        match snap.trailing_return(cfg.momentum_lookback) {
            Some(ret) => (
                ret >= -cfg.crash_return,
                format!(
                    "{}-bar return {ret:.6} vs floor {:.4}",
                    cfg.momentum_lookback, -cfg.crash_return
                ),
            ),
            None => (
                false,
                format!(
                    "cannot evaluate: {} bars < lookback {}",
                    snap.candles.len(),
                    cfg.momentum_lookback + 1
                ),
            ),
        }
    } else {
        (true, "not a support test".to_string())
    };
    gate!(Gate::FallingKnife, passed, detail);

    // ── Gate 4: short squeeze (resistance only) ─────────────────────────
    let (passed, detail) = if inp.kind == LevelKind::Resistance {
        match snap.trailing_return(cfg.momentum_lookback) {
            Some(ret) => (
                ret <= cfg.squeeze_return,
                format!(
                    "{}-bar return {ret:.6} vs cap {:.4}",
                    cfg.momentum_lookback, cfg.squeeze_return
                ),
            ),
            None => (
                false,
                format!(
                    "cannot evaluate: {} bars < lookback {}",
                    snap.candles.len(),
                    cfg.momentum_lookback + 1
                ),
            ),
        }
    } else {
        (true, "not a resistance test".to_string())
    };
    gate!(Gate::ShortSqueeze, passed, detail);

    // ── Gate 5: oscillator panic/FOMO ───────────────────────────────────
    let (passed, detail) = match snap.oscillator {
        Some(osc) => {
            let extreme = osc < cfg.osc_panic || osc > cfg.osc_fomo;
            (
                !(extreme && p.value < cfg.panic_score_floor),
                format!(
                    "osc={osc:.2} band [{:.0}, {:.0}] score {}",
                    cfg.osc_panic, cfg.osc_fomo, p.value
                ),
            )
        }
        None => (false, "cannot evaluate: oscillator missing".to_string()),
    };
    gate!(Gate::OscillatorExtreme, passed, detail);

    // ── Gate 6: sentiment trap ──────────────────────────────────────────
    let (passed, detail) = match (snap.funding_rate, snap.vwap) {
        (Some(funding), Some(vwap)) => match inp.side {
            // Crowd long + price below VWAP: the long is the exit liquidity.
            Side::Long => (
                !(funding > cfg.long_trap_funding && snap.price < vwap),
                format!("funding={funding:.6} price={:.8} vwap={vwap:.8}", snap.price),
            ),
            Side::Short => (
                !(funding < cfg.short_trap_funding && snap.price > vwap),
                format!("funding={funding:.6} price={:.8} vwap={vwap:.8}", snap.price),
            ),
        },
        (f, v) => (
            false,
            format!(
                "cannot evaluate: funding {} vwap {}",
                if f.is_some() { "present" } else { "missing" },
                if v.is_some() { "present" } else { "missing" }
            ),
        ),
    };
    gate!(Gate::SentimentTrap, passed, detail);

    // ── Post-direction anti-trap ────────────────────────────────────────
    // A long planned into a STRONG ceiling (or a short into a STRONG floor)
    // has its exit path blocked; checked against the planned entry.
    let opposing = match inp.side {
        Side::Long => LevelKind::Resistance,
        Side::Short => LevelKind::Support,
    };
    let (passed, detail) = match inp
        .book
        .near_strong(opposing, inp.event_level, cfg.anti_trap_distance)
    {
        Some(lvl) => (
            false,
            format!(
                "strong {:?} at {:.8} within {:.4} of entry {:.8}",
                opposing, lvl.price, cfg.anti_trap_distance, inp.event_level
            ),
        ),
        None => (
            true,
            format!(
                "no strong {:?} within {:.4} of entry",
                opposing, cfg.anti_trap_distance
            ),
        ),
    };
    gate!(Gate::AntiTrap, passed, detail);

    KevlarVerdict {
        passed: true,
        first_failing_gate: None,
        gates,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
