use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// OHLCV bar representation — contiguous fixed-timeframe layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub t: i64, // open time (ms since epoch)
    pub o: f64, // open
    pub h: f64, // high
    pub l: f64, // low
    pub c: f64, // close
    pub v: f64, // volume
}

/// Minimum series length for any analysis to run.
pub const MIN_CANDLES: usize = 5;

/// Validate a fixed-timeframe candle series.
///
/// Requirements: at least [`MIN_CANDLES`] bars, strictly increasing
/// timestamps, and exactly one timeframe unit between consecutive bars.
/// A larger gap means the upstream feed dropped bars; a smaller one means
/// mixed timeframes. Both are integrity failures, never repaired here.
pub fn validate_series(candles: &[Candle], timeframe_ms: i64) -> Result<(), CoreError> {
    if candles.len() < MIN_CANDLES {
        return Err(CoreError::DataIntegrity(format!(
            "candle series too short: {} bars < {MIN_CANDLES}",
            candles.len()
        )));
    }

    for (i, pair) in candles.windows(2).enumerate() {
        let dt = pair[1].t - pair[0].t;
        if dt <= 0 {
            return Err(CoreError::DataIntegrity(format!(
                "candle timestamps not strictly increasing at index {}: {} -> {}",
                i + 1,
                pair[0].t,
                pair[1].t
            )));
        }
        if dt != timeframe_ms {
            return Err(CoreError::DataIntegrity(format!(
                "candle gap at index {}: {dt}ms != timeframe {timeframe_ms}ms",
                i + 1
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TF: i64 = 30 * 60 * 1000;

    fn series(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| Candle {
                t: i as i64 * TF,
                o: 100.0,
                h: 101.0,
                l: 99.0,
                c: 100.0,
                v: 1_000.0,
            })
            .collect()
    }

    #[test]
    fn accepts_contiguous_series() {
        assert!(validate_series(&series(10), TF).is_ok());
    }

    #[test]
    fn rejects_short_series() {
        let err = validate_series(&series(4), TF).unwrap_err();
        assert!(matches!(err, CoreError::DataIntegrity(_)));
    }

    #[test]
    fn rejects_gap() {
        let mut c = series(10);
        c[7].t += TF; // one missing bar between index 6 and 7
        assert!(validate_series(&c, TF).is_err());
    }

    #[test]
    fn rejects_out_of_order() {
        let mut c = series(10);
        c.swap(3, 4);
        assert!(validate_series(&c, TF).is_err());
    }

    #[test]
    fn rejects_sub_timeframe_spacing() {
        let mut c = series(10);
        c[5].t = c[4].t + TF / 2;
        assert!(validate_series(&c, TF).is_err());
    }
}
