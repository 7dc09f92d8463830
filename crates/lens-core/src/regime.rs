//! Volatility/trend regime from a reference asset's rate-of-change series.
//!
//! `z = (roc - mean(window)) / stddev(window)` over the trailing z-window,
//! sample stddev. A thin window or a flat series is a data-integrity
//! failure, not a silent NEUTRAL: classification only exists when the
//! statistics do.

use serde::Serialize;

use crate::config::RegimeConfig;
use crate::error::CoreError;
use crate::indicators::RingBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Regime {
    Expansion,
    Compression,
    Neutral,
}

/// Classify the current regime from the ROC series (oldest first).
pub fn classify(roc: &[f64], cfg: &RegimeConfig) -> Result<Regime, CoreError> {
    if roc.is_empty() || roc.len() < cfg.min_samples {
        return Err(CoreError::DataIntegrity(format!(
            "regime window too thin: {} samples < {}",
            roc.len(),
            cfg.min_samples.max(1)
        )));
    }

    let mut window = RingBuf::new(cfg.z_window);
    let start = roc.len().saturating_sub(cfg.z_window);
    for &v in &roc[start..] {
        window.push(v);
    }

    let std = window.std_samp();
    if std == 0.0 {
        return Err(CoreError::DataIntegrity(
            "regime stddev is zero; z-score undefined".into(),
        ));
    }

    let current = roc[roc.len() - 1];
    let z = (current - window.mean()) / std;

    let regime = if z > cfg.z_threshold {
        Regime::Compression
    } else if z < -cfg.z_threshold {
        Regime::Expansion
    } else {
        Regime::Neutral
    };

    tracing::debug!(z, ?regime, "regime classified");
    Ok(regime)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(min_samples: usize) -> RegimeConfig {
        RegimeConfig {
            z_window: 180,
            min_samples,
            z_threshold: 1.25,
            roc_period: 30,
        }
    }

    /// Alternating series with a known mean/std, ending on a chosen value.
    fn series_ending_in(last: f64) -> Vec<f64> {
        let mut v: Vec<f64> = (0..179).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        v.push(last);
        v
    }

    #[test]
    fn spike_up_is_compression() {
        let roc = series_ending_in(10.0);
        assert_eq!(classify(&roc, &cfg(180)).unwrap(), Regime::Compression);
    }

    #[test]
    fn spike_down_is_expansion() {
        let roc = series_ending_in(-10.0);
        assert_eq!(classify(&roc, &cfg(180)).unwrap(), Regime::Expansion);
    }

    #[test]
    fn mid_band_is_neutral() {
        let roc = series_ending_in(1.0);
        assert_eq!(classify(&roc, &cfg(180)).unwrap(), Regime::Neutral);
    }

    #[test]
    fn thin_window_fails_closed() {
        let roc = vec![1.0; 50];
        let err = classify(&roc, &cfg(180)).unwrap_err();
        assert!(matches!(err, CoreError::DataIntegrity(_)));
    }

    #[test]
    fn flat_series_fails_closed() {
        let roc = vec![2.5; 200];
        let err = classify(&roc, &cfg(180)).unwrap_err();
        assert!(matches!(err, CoreError::DataIntegrity(_)));
    }

    #[test]
    fn classification_is_deterministic() {
        let roc = series_ending_in(0.7);
        let a = classify(&roc, &cfg(180)).unwrap();
        let b = classify(&roc, &cfg(180)).unwrap();
        assert_eq!(a, b);
    }
}
