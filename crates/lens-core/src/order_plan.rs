//! Deterministic order calculator.
//!
//! A single source of truth for the order math: entry, stop, targets, size
//! and RRR. Pure logic, zero randomness, no I/O. A plan either clears every
//! sanity gate or does not exist — there is no partially valid plan.

use serde::Serialize;

use crate::config::{OrderConfig, RiskConfig};
use crate::event::Side;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Fully specified order plan. Constructed only for TRADE decisions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderPlan {
    pub side: Side,
    /// Entry at the level price — limit order semantics, never market.
    pub entry: f64,
    pub stop_loss: f64,
    pub tp1: f64,
    pub tp2: f64,
    pub tp3: f64,
    pub position_size: f64,
    /// Reward/risk measured against the second target.
    pub rrr: f64,
    pub risk_amount: f64,
}

/// Named sanity check that blocked a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanCheck {
    StopDistance,
    PositionSize,
    MinRrr,
    FundingRrr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanBlock {
    pub check: PlanCheck,
    pub detail: String,
}

/// Inputs to one plan computation, all resolved upstream.
#[derive(Debug, Clone, Copy)]
pub struct PlanInput {
    pub side: Side,
    /// Level price from the admitted event.
    pub level: f64,
    /// ATR(14) at decision time.
    pub atr: f64,
    /// Fractional funding rate; validated present by the cascade.
    pub funding_rate: f64,
}

// ---------------------------------------------------------------------------
// Calculator
// ---------------------------------------------------------------------------

pub fn build_order_plan(
    inp: &PlanInput,
    order: &OrderConfig,
    risk: &RiskConfig,
) -> Result<OrderPlan, PlanBlock> {
    let entry = inp.level;

    // Offsets are fixed ATR multiples, mirrored per side.
    let (stop_loss, tp1, tp2, tp3) = match inp.side {
        Side::Long => (
            entry - order.stop_atr * inp.atr,
            entry + order.tp1_atr * inp.atr,
            entry + order.tp2_atr * inp.atr,
            entry + order.tp3_atr * inp.atr,
        ),
        Side::Short => (
            entry + order.stop_atr * inp.atr,
            entry - order.tp1_atr * inp.atr,
            entry - order.tp2_atr * inp.atr,
            entry - order.tp3_atr * inp.atr,
        ),
    };

    let stop_dist = (entry - stop_loss).abs();
    if stop_dist == 0.0 {
        return Err(PlanBlock {
            check: PlanCheck::StopDistance,
            detail: "stop distance is zero".to_string(),
        });
    }

    let risk_amount = risk.capital * risk.risk_fraction;
    let raw_size = risk_amount / stop_dist;

    // Exchange lot step: floor, never round up past the risk budget.
    let position_size = match risk.lot_step {
        Some(step) => (raw_size / step).floor() * step,
        None => raw_size,
    };

    if position_size <= 0.0 {
        return Err(PlanBlock {
            check: PlanCheck::PositionSize,
            detail: format!("size {position_size:.8} <= 0 (raw {raw_size:.8})"),
        });
    }

    let rrr = (tp2 - entry).abs() / stop_dist;
    if rrr < order.min_rrr {
        return Err(PlanBlock {
            check: PlanCheck::MinRrr,
            detail: format!("rrr {rrr:.4} < min {:.2}", order.min_rrr),
        });
    }
    if inp.funding_rate > order.funding_cap && rrr < order.funding_rrr_floor {
        return Err(PlanBlock {
            check: PlanCheck::FundingRrr,
            detail: format!(
                "funding {:.6} > {:.4} requires rrr >= {:.2}, got {rrr:.4}",
                inp.funding_rate, order.funding_cap, order.funding_rrr_floor
            ),
        });
    }

    Ok(OrderPlan {
        side: inp.side,
        entry,
        stop_loss,
        tp1,
        tp2,
        tp3,
        position_size,
        rrr,
        risk_amount,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn input(side: Side) -> PlanInput {
        PlanInput {
            side,
            level: 100.0,
            atr: 10.0,
            funding_rate: 0.0001,
        }
    }

    fn order() -> OrderConfig {
        OrderConfig::default()
    }

    fn risk() -> RiskConfig {
        RiskConfig {
            capital: 1_000.0,
            risk_fraction: 0.01,
            lot_step: None,
        }
    }

    #[test]
    fn long_plan_matches_reference_vector() {
        let plan = build_order_plan(&input(Side::Long), &order(), &risk()).unwrap();
        assert!((plan.entry - 100.0).abs() < 1e-12);
        assert!((plan.stop_loss - 90.0).abs() < 1e-12);
        assert!((plan.tp1 - 107.5).abs() < 1e-12);
        assert!((plan.tp2 - 112.5).abs() < 1e-12);
        assert!((plan.tp3 - 120.0).abs() < 1e-12);
        assert!((plan.rrr - 1.25).abs() < 1e-12);
        // Risk $10 over a $10 stop distance.
        assert!((plan.position_size - 1.0).abs() < 1e-12);
        assert!((plan.risk_amount - 10.0).abs() < 1e-12);
    }

    #[test]
    fn short_plan_mirrors_long() {
        let plan = build_order_plan(&input(Side::Short), &order(), &risk()).unwrap();
        assert!((plan.stop_loss - 110.0).abs() < 1e-12);
        assert!((plan.tp1 - 92.5).abs() < 1e-12);
        assert!((plan.tp2 - 87.5).abs() < 1e-12);
        assert!((plan.tp3 - 80.0).abs() < 1e-12);
        assert!((plan.rrr - 1.25).abs() < 1e-12);
    }

    #[test]
    fn zero_stop_distance_blocks() {
        let mut inp = input(Side::Long);
        inp.atr = 0.0;
        let err = build_order_plan(&inp, &order(), &risk()).unwrap_err();
        assert_eq!(err.check, PlanCheck::StopDistance);
    }

    #[test]
    fn rrr_gate_passes_at_125_blocks_at_105() {
        // tp2 at 1.25 ATR over a 1.0 ATR stop -> RRR 1.25 -> passes.
        assert!(build_order_plan(&input(Side::Long), &order(), &risk()).is_ok());

        // tp2 distance 10.5 over stop distance 10 -> RRR 1.05 -> blocked.
        let mut o = order();
        o.tp2_atr = 1.05;
        let err = build_order_plan(&input(Side::Long), &o, &risk()).unwrap_err();
        assert_eq!(err.check, PlanCheck::MinRrr);
    }

    #[test]
    fn overheated_funding_demands_better_rrr() {
        let mut inp = input(Side::Long);
        inp.funding_rate = 0.006; // > 0.5% cap; default RRR 1.25 < 1.30
        let err = build_order_plan(&inp, &order(), &risk()).unwrap_err();
        assert_eq!(err.check, PlanCheck::FundingRrr);

        // Same funding with a wider TP2 clears the floor.
        let mut o = order();
        o.tp2_atr = 1.5;
        assert!(build_order_plan(&inp, &o, &risk()).is_ok());
    }

    #[test]
    fn lot_step_floors_the_size() {
        let mut r = risk();
        r.lot_step = Some(0.3);
        let plan = build_order_plan(&input(Side::Long), &order(), &r).unwrap();
        // raw size 1.0 floored to 0.9.
        assert!((plan.position_size - 0.9).abs() < 1e-12);
    }

    #[test]
    fn lot_step_flooring_to_zero_blocks() {
        let mut r = risk();
        r.lot_step = Some(5.0); // raw size 1.0 floors to 0
        let err = build_order_plan(&input(Side::Long), &order(), &r).unwrap_err();
        assert_eq!(err.check, PlanCheck::PositionSize);
    }

    #[test]
    fn plan_is_deterministic() {
        let a = build_order_plan(&input(Side::Long), &order(), &risk()).unwrap();
        let b = build_order_plan(&input(Side::Long), &order(), &risk()).unwrap();
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}
