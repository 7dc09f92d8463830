//! Support/resistance level engine.
//!
//! Pipeline: swing-pivot detection (symmetric window) → reaction
//! confirmation (price must move `react_factor × ATR` away from the pivot
//! within `react_bars`) → ATR-tolerance merging → touch/age scoring.
//!
//! Determinism: pivots are processed in chronological order with ties broken
//! by price ascending, and merging always picks the first matching level in
//! creation order. For a fixed series and config the book is identical on
//! every run.

use serde::Serialize;

use crate::candle::{validate_series, Candle};
use crate::config::LevelConfig;
use crate::error::CoreError;
use crate::indicators::atr::AtrIndicator;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelKind {
    Support,
    Resistance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelGrade {
    Strong,
    Medium,
    Weak,
}

/// One scored level. Immutable once the book is built; a fresh book is
/// computed per request, never patched in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Level {
    pub price: f64,
    pub kind: LevelKind,
    pub touches: u32,
    pub age_bars: u32,
    pub score: f64,
    pub grade: LevelGrade,
    /// Ghosts stay in the book for proximity math but are never trade
    /// candidates.
    pub ghost: bool,
}

/// All levels derived from one candle series, ghosts included.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LevelBook {
    levels: Vec<Level>,
}

// Grade cutoffs on the local score scale. Note this scale skews negative
// with age and is intentionally not comparable to alert-side scores.
const STRONG_SCORE: f64 = 3.0;
const MEDIUM_SCORE: f64 = 1.0;

impl LevelBook {
    /// Assemble a book from precomputed levels (replay or collaborator
    /// injection). Normal use goes through [`build_level_book`].
    pub fn from_levels(levels: Vec<Level>) -> Self {
        Self { levels }
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    /// Find the tradeable level backing an event: same kind, within
    /// `tolerance` of the event's level price, within `max_distance_pct` of
    /// the current price, and not a ghost. Nearest match wins; ties resolve
    /// to the lower price.
    pub fn candidate(
        &self,
        kind: LevelKind,
        event_level: f64,
        current_price: f64,
        tolerance: f64,
        max_distance_pct: f64,
    ) -> Option<&Level> {
        self.levels
            .iter()
            .filter(|l| l.kind == kind && !l.ghost)
            .filter(|l| (l.price - event_level).abs() <= tolerance)
            .filter(|l| {
                current_price > 0.0
                    && (l.price - current_price).abs() / current_price * 100.0 <= max_distance_pct
            })
            .min_by(|a, b| {
                let da = (a.price - event_level).abs();
                let db = (b.price - event_level).abs();
                da.total_cmp(&db).then(a.price.total_cmp(&b.price))
            })
    }

    /// Nearest STRONG level of the given kind within `dist_frac` of `price`.
    /// Used by the anti-trap check; scans the whole book (ghosts can never
    /// be strong, so no extra filter is needed).
    pub fn near_strong(&self, kind: LevelKind, price: f64, dist_frac: f64) -> Option<&Level> {
        if price <= 0.0 {
            return None;
        }
        self.levels
            .iter()
            .filter(|l| l.kind == kind && l.grade == LevelGrade::Strong)
            .filter(|l| (l.price - price).abs() / price <= dist_frac)
            .min_by(|a, b| {
                let da = (a.price - price).abs();
                let db = (b.price - price).abs();
                da.total_cmp(&db).then(a.price.total_cmp(&b.price))
            })
    }
}

// ---------------------------------------------------------------------------
// Book construction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Pivot {
    idx: usize,
    price: f64,
    kind: LevelKind,
    atr: f64,
}

/// Running merge state, folded into a [`Level`] once all pivots are in.
#[derive(Debug)]
struct RawLevel {
    price: f64,
    kind: LevelKind,
    atr: f64,
    touches: u32,
    first_idx: usize,
}

/// Build the level book for a validated candle series.
///
/// Fails with a data-integrity error when the series itself is unusable;
/// an empty book (no confirmed levels) is a valid result.
pub fn build_level_book(
    candles: &[Candle],
    timeframe_ms: i64,
    cfg: &LevelConfig,
) -> Result<LevelBook, CoreError> {
    validate_series(candles, timeframe_ms)?;

    let atr = atr_by_bar(candles, cfg.atr_window);
    let pivots = confirmed_pivots(candles, &atr, cfg);

    let mut raw: Vec<RawLevel> = Vec::new();
    for p in &pivots {
        let tolerance = cfg.merge_factor * p.atr;
        match raw
            .iter_mut()
            .find(|l| l.kind == p.kind && (l.price - p.price).abs() < tolerance)
        {
            Some(lvl) => {
                let t = lvl.touches as f64;
                lvl.price = (lvl.price * t + p.price) / (t + 1.0);
                lvl.atr = (lvl.atr * t + p.atr) / (t + 1.0);
                lvl.touches += 1;
                // Age stays anchored at the earliest contributing pivot.
                lvl.first_idx = lvl.first_idx.min(p.idx);
            }
            None => raw.push(RawLevel {
                price: p.price,
                kind: p.kind,
                atr: p.atr,
                touches: 1,
                first_idx: p.idx,
            }),
        }
    }

    let last_idx = candles.len() - 1;
    let mut levels: Vec<Level> = raw
        .into_iter()
        .map(|l| {
            let age_bars = (last_idx - l.first_idx) as u32;
            let score = cfg.touch_weight * f64::from(l.touches) - cfg.age_weight * f64::from(age_bars);
            let grade = if score >= STRONG_SCORE {
                LevelGrade::Strong
            } else if score >= MEDIUM_SCORE {
                LevelGrade::Medium
            } else {
                LevelGrade::Weak
            };
            Level {
                price: l.price,
                kind: l.kind,
                touches: l.touches,
                age_bars,
                score,
                grade,
                ghost: score < cfg.ghost_threshold,
            }
        })
        .collect();

    levels.sort_by(|a, b| a.price.total_cmp(&b.price).then_with(|| a.kind.cmp_key().cmp(&b.kind.cmp_key())));

    tracing::debug!(
        total = levels.len(),
        ghosts = levels.iter().filter(|l| l.ghost).count(),
        "level book built"
    );

    Ok(LevelBook { levels })
}

impl LevelKind {
    fn cmp_key(self) -> u8 {
        match self {
            LevelKind::Support => 0,
            LevelKind::Resistance => 1,
        }
    }
}

/// Per-bar Wilder ATR; NaN until warm.
fn atr_by_bar(candles: &[Candle], window: usize) -> Vec<f64> {
    let mut ind = AtrIndicator::new(window);
    candles
        .iter()
        .map(|c| {
            let v = ind.update(c.h, c.l, c.c);
            if ind.is_warm() {
                v
            } else {
                f64::NAN
            }
        })
        .collect()
}

/// Detect swing pivots and keep only those that later saw a genuine price
/// reaction. The output is sorted chronologically, ties by price ascending.
fn confirmed_pivots(candles: &[Candle], atr: &[f64], cfg: &LevelConfig) -> Vec<Pivot> {
    let n = candles.len();
    let w = cfg.pivot_window;
    let mut out = Vec::new();

    if n < 2 * w + 1 {
        return out;
    }

    for idx in w..n - w {
        if atr[idx].is_nan() {
            continue;
        }
        let confirm_idx = idx + cfg.react_bars;
        if confirm_idx >= n {
            // No room left to observe a reaction; the pivot never matures.
            continue;
        }

        let is_high = (1..=w).all(|j| candles[idx].h >= candles[idx - j].h && candles[idx].h >= candles[idx + j].h);
        let is_low = (1..=w).all(|j| candles[idx].l <= candles[idx - j].l && candles[idx].l <= candles[idx + j].l);

        let reaction = cfg.react_factor * atr[idx];
        let window = &candles[idx..=confirm_idx];

        let mut found: Vec<Pivot> = Vec::with_capacity(2);
        if is_high {
            let min_low = window.iter().map(|c| c.l).fold(f64::INFINITY, f64::min);
            if candles[idx].h - min_low >= reaction {
                found.push(Pivot {
                    idx,
                    price: candles[idx].h,
                    kind: LevelKind::Resistance,
                    atr: atr[idx],
                });
            }
        }
        if is_low {
            let max_high = window.iter().map(|c| c.h).fold(f64::NEG_INFINITY, f64::max);
            if max_high - candles[idx].l >= reaction {
                found.push(Pivot {
                    idx,
                    price: candles[idx].l,
                    kind: LevelKind::Support,
                    atr: atr[idx],
                });
            }
        }

        // Same-bar high+low pivots: lower price first.
        found.sort_by(|a, b| a.price.total_cmp(&b.price));
        out.extend(found);
    }

    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const TF: i64 = 30 * 60 * 1000;

    fn bar(i: usize, o: f64, h: f64, l: f64, c: f64) -> Candle {
        Candle {
            t: i as i64 * TF,
            o,
            h,
            l,
            c,
            v: 1_000.0,
        }
    }

    /// Flat tape with a resistance spike at `spike_at` and a sell-off right
    /// after, deep enough to confirm the pivot's reaction.
    fn spike_series(n: usize, spike_at: usize, spike_high: f64) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                if i == spike_at {
                    bar(i, 100.0, spike_high, 99.0, 100.0)
                } else if i > spike_at && i <= spike_at + 10 {
                    bar(i, 92.0, 93.0, 91.0, 92.0)
                } else {
                    bar(i, 100.0, 101.0, 99.0, 100.0)
                }
            })
            .collect()
    }

    fn cfg() -> LevelConfig {
        LevelConfig::default()
    }

    #[test]
    fn detects_confirmed_resistance() {
        let candles = spike_series(60, 20, 110.0);
        let book = build_level_book(&candles, TF, &cfg()).unwrap();

        let res: Vec<&Level> = book
            .levels()
            .iter()
            .filter(|l| l.kind == LevelKind::Resistance)
            .collect();
        assert!(
            res.iter().any(|l| (l.price - 110.0).abs() < 1e-9),
            "expected resistance at 110, got {res:?}"
        );
    }

    #[test]
    fn unreacted_pivot_is_dropped() {
        // Same tape, but the reaction bar is set high enough that the
        // observed move no longer qualifies: no confirmation, no level.
        let candles = spike_series(60, 20, 110.0);
        let mut c = cfg();
        c.react_factor = 10.0;
        let book = build_level_book(&candles, TF, &c).unwrap();
        assert!(
            !book
                .levels()
                .iter()
                .any(|l| l.kind == LevelKind::Resistance && (l.price - 110.0).abs() < 1e-9),
            "pivot with no reaction must not become a level"
        );
    }

    #[test]
    fn pivot_without_room_to_mature_is_dropped() {
        // Spike too close to the end of the series: the reaction window
        // never completes, so the pivot cannot become a level.
        let candles = spike_series(60, 50, 110.0);
        let book = build_level_book(&candles, TF, &cfg()).unwrap();
        assert!(!book
            .levels()
            .iter()
            .any(|l| l.kind == LevelKind::Resistance && (l.price - 110.0).abs() < 1e-9));
    }

    #[test]
    fn nearby_pivots_merge_and_sum_touches() {
        // Two spikes near the same price; merge tolerance is 0.6 * ATR and
        // the tape's ATR is a few points, comfortably above the 0.5 spread.
        let mut candles = spike_series(90, 20, 110.0);
        for i in 45..90 {
            candles[i] = if i == 50 {
                bar(i, 100.0, 110.5, 99.0, 100.0)
            } else if i > 50 && i <= 60 {
                bar(i, 92.0, 93.0, 91.0, 92.0)
            } else {
                bar(i, 100.0, 101.0, 99.0, 100.0)
            };
        }

        let book = build_level_book(&candles, TF, &cfg()).unwrap();
        let merged: Vec<&Level> = book
            .levels()
            .iter()
            .filter(|l| l.kind == LevelKind::Resistance && l.price > 105.0)
            .collect();

        assert_eq!(merged.len(), 1, "expected one merged level, got {merged:?}");
        assert_eq!(merged[0].touches, 2);
        // Touch-weighted mean of 110.0 and 110.5.
        assert!((merged[0].price - 110.25).abs() < 1e-9);
        // Age anchored at the earliest pivot (bar 20 of 90).
        assert_eq!(merged[0].age_bars, 69);
    }

    #[test]
    fn score_formula_and_ghost_flag() {
        let candles = spike_series(60, 20, 110.0);
        let mut c = cfg();
        c.age_weight = 0.5; // age 39 -> score = 1 - 19.5 = -18.5 < ghost(-10)
        let book = build_level_book(&candles, TF, &c).unwrap();

        let lvl = book
            .levels()
            .iter()
            .find(|l| l.kind == LevelKind::Resistance && (l.price - 110.0).abs() < 1e-9)
            .expect("level exists");
        assert!((lvl.score - (1.0 - 0.5 * f64::from(lvl.age_bars))).abs() < 1e-9);
        assert!(lvl.ghost);
        assert_eq!(lvl.grade, LevelGrade::Weak);

        // Ghosts stay out of candidacy but remain available for proximity.
        assert!(book
            .candidate(LevelKind::Resistance, 110.0, 100.0, 5.0, 30.0)
            .is_none());
        assert!(book.levels().iter().any(|l| l.ghost));
    }

    #[test]
    fn candidate_respects_distance_cap() {
        let candles = spike_series(60, 20, 110.0);
        let book = build_level_book(&candles, TF, &cfg()).unwrap();

        assert!(book
            .candidate(LevelKind::Resistance, 110.0, 100.0, 5.0, 30.0)
            .is_some());
        // 10% away from price but cap is 5%.
        assert!(book
            .candidate(LevelKind::Resistance, 110.0, 100.0, 5.0, 5.0)
            .is_none());
    }

    #[test]
    fn book_is_deterministic() {
        let candles = spike_series(80, 22, 111.0);
        let a = build_level_book(&candles, TF, &cfg()).unwrap();
        let b = build_level_book(&candles, TF, &cfg()).unwrap();
        assert_eq!(
            serde_json::to_string(&a.levels()).unwrap(),
            serde_json::to_string(&b.levels()).unwrap()
        );
    }

    #[test]
    fn short_series_is_an_integrity_failure() {
        let candles = spike_series(4, 2, 110.0);
        assert!(build_level_book(&candles, TF, &cfg()).is_err());
    }
}
