use crate::candle::Candle;

/// Rolling volume-weighted average price over the trailing `window` bars
/// (48 × 30m = 24h). Returns `None` when total volume is zero — VWAP is
/// then genuinely undefined and consumers must fail closed.
pub fn rolling_vwap(candles: &[Candle], window: usize) -> Option<f64> {
    if candles.is_empty() {
        return None;
    }
    let start = candles.len().saturating_sub(window);
    let tail = &candles[start..];

    let (pv, vol) = tail
        .iter()
        .fold((0.0, 0.0), |(pv, vol), c| (pv + c.c * c.v, vol + c.v));

    if vol > 0.0 {
        Some(pv / vol)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(c: f64, v: f64) -> Candle {
        Candle {
            t: 0,
            o: c,
            h: c,
            l: c,
            c,
            v,
        }
    }

    #[test]
    fn weights_by_volume() {
        let candles = vec![bar(100.0, 1.0), bar(200.0, 3.0)];
        let vwap = rolling_vwap(&candles, 48).unwrap();
        assert!((vwap - 175.0).abs() < 1e-12);
    }

    #[test]
    fn zero_volume_is_undefined() {
        let candles = vec![bar(100.0, 0.0), bar(101.0, 0.0)];
        assert!(rolling_vwap(&candles, 48).is_none());
    }

    #[test]
    fn window_limits_lookback() {
        let candles = vec![bar(10.0, 100.0), bar(100.0, 1.0), bar(100.0, 1.0)];
        let vwap = rolling_vwap(&candles, 2).unwrap();
        assert!((vwap - 100.0).abs() < 1e-12);
    }
}
