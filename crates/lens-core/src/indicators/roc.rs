/// Rate-of-change series in percent over a fixed lookback:
/// `roc[i] = (close[i] - close[i-period]) / close[i-period] * 100`.
///
/// Entries with a non-positive base close are skipped — a zero or negative
/// price is not a meaningful base and must not inject NaN/inf into the
/// regime window.
pub fn roc_series(closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || closes.len() <= period {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(closes.len() - period);
    for i in period..closes.len() {
        let base = closes[i - period];
        if base > 0.0 {
            out.push((closes[i] - base) / base * 100.0);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_percent_change() {
        let closes = [100.0, 110.0, 121.0];
        let roc = roc_series(&closes, 1);
        assert_eq!(roc.len(), 2);
        assert!((roc[0] - 10.0).abs() < 1e-12);
        assert!((roc[1] - 10.0).abs() < 1e-12);
    }

    #[test]
    fn short_input_yields_empty() {
        assert!(roc_series(&[100.0], 30).is_empty());
    }

    #[test]
    fn zero_base_is_skipped() {
        let closes = [0.0, 100.0, 110.0];
        let roc = roc_series(&closes, 1);
        assert_eq!(roc.len(), 1);
        assert!((roc[0] - 10.0).abs() < 1e-12);
    }
}
