//! Decision orchestrator.
//!
//! Ties the level engine, regime classifier, P-Score, safety cascade and
//! order calculator into one auditable decision. The output
//! [`DecisionRecord`] is append-only and is the sole externally visible
//! product of the core; everything else is working state.

use serde::Serialize;

use crate::candle::validate_series;
use crate::config::PipelineConfig;
use crate::error::CoreError;
use crate::event::SignalEvent;
use crate::kevlar::{run_cascade, CascadeInput, Gate, KevlarVerdict};
use crate::levels::{build_level_book, LevelKind};
use crate::order_plan::{build_order_plan, OrderPlan, PlanCheck, PlanInput};
use crate::pscore::{calculate, PScoreInput, PScoreResult};
use crate::regime::classify;
use crate::snapshot::MarketSnapshot;

// ---------------------------------------------------------------------------
// Record types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Trade,
    NoTrade,
}

/// Specific, named cause of a NO_TRADE outcome. Gate blocks are legitimate
/// outcomes; the other variants are input defects. There is no catch-all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NoTradeReason {
    Validation { detail: String },
    DataIntegrity { detail: String },
    GateBlocked { gate: Gate, detail: String },
    PlanBlocked { check: PlanCheck, detail: String },
}

/// The one record a decision cycle produces. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionRecord {
    pub event_id: String,
    pub symbol: String,
    pub decision: Decision,
    pub reason: Option<NoTradeReason>,
    pub p_score: Option<PScoreResult>,
    pub kevlar: Option<KevlarVerdict>,
    pub order_plan: Option<OrderPlan>,
    /// Bar open time from the event (Unix seconds).
    pub bar_time: i64,
    /// Snapshot close time (ms) — not wall clock, for reproducibility.
    pub decided_at_ms: i64,
}

impl DecisionRecord {
    /// Record for an event the admission layer rejected outright
    /// (malformed symbol, implausible timestamp). No market data was ever
    /// consulted.
    pub fn validation_rejected(
        event_id: impl Into<String>,
        symbol: impl Into<String>,
        bar_time: i64,
        decided_at_ms: i64,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            symbol: symbol.into(),
            decision: Decision::NoTrade,
            reason: Some(NoTradeReason::Validation {
                detail: detail.into(),
            }),
            p_score: None,
            kevlar: None,
            order_plan: None,
            bar_time,
            decided_at_ms,
        }
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Run one full decision cycle over an admitted event.
///
/// Pure in `(event, snap, cfg)`: nothing is fetched, nothing is mutated,
/// and repeated calls yield byte-identical serialized records.
pub fn decide(
    event_id: &str,
    event: &SignalEvent,
    snap: &MarketSnapshot,
    cfg: &PipelineConfig,
) -> DecisionRecord {
    let no_trade = |reason: NoTradeReason,
                    p_score: Option<PScoreResult>,
                    kevlar: Option<KevlarVerdict>| {
        DecisionRecord {
            event_id: event_id.to_string(),
            symbol: event.symbol.clone(),
            decision: Decision::NoTrade,
            reason: Some(reason),
            p_score,
            kevlar,
            order_plan: None,
            bar_time: event.bar_time,
            decided_at_ms: snap.taken_at_ms,
        }
    };
    let integrity = |e: CoreError| {
        no_trade(
            NoTradeReason::DataIntegrity {
                detail: e.to_string(),
            },
            None,
            None,
        )
    };

    // ── 1. Candle series integrity ──────────────────────────────────────
    if let Err(e) = validate_series(&snap.candles, cfg.engine.timeframe_ms()) {
        return integrity(e);
    }

    // ── 2. Level engine ─────────────────────────────────────────────────
    let book = match build_level_book(&snap.candles, cfg.engine.timeframe_ms(), &cfg.levels) {
        Ok(book) => book,
        Err(e) => return integrity(e),
    };

    let kind = match event.event_type.side() {
        crate::event::Side::Long => LevelKind::Support,
        crate::event::Side::Short => LevelKind::Resistance,
    };
    // The event's zone defines the minimum match width; ATR widens it on
    // volatile tape.
    let tolerance = event.zone_half.max(cfg.levels.merge_factor * snap.atr);
    let candidate = match book.candidate(
        kind,
        event.level,
        snap.price,
        tolerance,
        cfg.levels.max_distance_pct,
    ) {
        Some(lvl) => lvl.clone(),
        None => {
            return integrity(CoreError::DataIntegrity(format!(
                "no actionable {kind:?} level within {tolerance:.8} of event level {:.8}",
                event.level
            )))
        }
    };

    // ── 3. Regime ───────────────────────────────────────────────────────
    let regime = match classify(&snap.reference_roc, &cfg.regime) {
        Ok(r) => r,
        Err(e) => return integrity(e),
    };

    // ── 4. P-Score ──────────────────────────────────────────────────────
    let p_score = calculate(
        &PScoreInput {
            grade: candidate.grade,
            kind,
            regime,
            oscillator: snap.oscillator,
            oi_tier: snap.oi_tier,
            event_level_score: event.level_score,
        },
        &cfg.pscore,
    );

    // ── 5. Safety cascade ───────────────────────────────────────────────
    let side = event.event_type.side();
    let verdict = run_cascade(
        &CascadeInput {
            side,
            kind,
            event_level: event.level,
            p_score: &p_score,
            snap,
            book: &book,
        },
        &cfg.kevlar,
    );
    if !verdict.passed {
        let gate = verdict
            .first_failing_gate
            .expect("failed cascade names its gate");
        let detail = verdict
            .gates
            .last()
            .map(|g| g.detail.clone())
            .unwrap_or_default();
        // The integrity gate is an input defect, not a market veto; keep
        // the taxonomy honest in the record.
        let reason = if gate == Gate::DataIntegrity {
            NoTradeReason::DataIntegrity { detail }
        } else {
            NoTradeReason::GateBlocked { gate, detail }
        };
        return no_trade(reason, Some(p_score), Some(verdict));
    }

    // ── 6. Order plan ───────────────────────────────────────────────────
    // The cascade's sentiment gate cannot pass without a funding rate.
    let funding_rate = match snap.funding_rate {
        Some(f) => f,
        None => {
            return no_trade(
                NoTradeReason::DataIntegrity {
                    detail: "funding rate missing at plan construction".to_string(),
                },
                Some(p_score),
                Some(verdict),
            )
        }
    };
    let plan = match build_order_plan(
        &PlanInput {
            side,
            level: event.level,
            atr: snap.atr,
            funding_rate,
        },
        &cfg.order,
        &cfg.risk,
    ) {
        Ok(plan) => plan,
        Err(block) => {
            return no_trade(
                NoTradeReason::PlanBlocked {
                    check: block.check,
                    detail: block.detail,
                },
                Some(p_score),
                Some(verdict),
            )
        }
    };

    tracing::info!(
        symbol = %event.symbol,
        event_id = %event_id,
        score = p_score.value,
        rrr = plan.rrr,
        "trade plan produced"
    );

    DecisionRecord {
        event_id: event_id.to_string(),
        symbol: event.symbol.clone(),
        decision: Decision::Trade,
        reason: None,
        p_score: Some(p_score),
        kevlar: Some(verdict),
        order_plan: Some(plan),
        bar_time: event.bar_time,
        decided_at_ms: snap.taken_at_ms,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
