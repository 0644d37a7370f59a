//! Robustness sweep: re-run the whole pipeline under perturbed scan
//! parameters and check that the significance verdict is not an artifact of
//! one arbitrary configuration.

use log::info;
use serde::{Deserialize, Serialize};

use crate::dataset::{Candidate, Dataset};
use crate::error::EngineResult;
use crate::significance::SignificanceEngine;

/// Stability verdict over the swept scales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RobustnessVerdict {
    Stable,
    Unstable,
}

impl std::fmt::Display for RobustnessVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stable => write!(f, "STABLE"),
            Self::Unstable => write!(f, "UNSTABLE"),
        }
    }
}

/// One swept configuration's outcome.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScaleOutcome {
    pub scale: f64,
    pub n_tests: usize,
    /// Candidates with `p_raw` below the configured significance threshold.
    pub n_hits: usize,
    pub hit_rate: f64,
    /// `-log2(hit_rate)`; `None` when the hit rate is exactly zero.
    pub rarity_bits: Option<f64>,
}

/// Sweep summary across all scales.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobustnessReport {
    pub outcomes: Vec<ScaleOutcome>,
    /// Largest pairwise hit-rate deviation (max - min).
    pub hit_rate_spread: f64,
    /// Max/min hit-rate ratio; `None` when some scale hit zero while another
    /// did not (an effectively infinite ratio).
    pub hit_rate_ratio: Option<f64>,
    pub verdict: RobustnessVerdict,
}

/// Re-run the full pipeline once per configured scale factor.
///
/// `provider` maps a scale to the dataset and candidate population it
/// implies — candidate sampling is governed by scan parameters owned by the
/// caller. The engine's seed is reused per scale, so the whole sweep is a
/// deterministic function of `(provider, config)`.
pub fn sweep<F>(engine: &SignificanceEngine, provider: F) -> EngineResult<RobustnessReport>
where
    F: Fn(f64) -> (Dataset, Vec<Candidate>),
{
    let config = engine.config();
    let threshold = config.significance_threshold;

    let mut outcomes = Vec::with_capacity(config.robustness_scales.len());
    for &scale in &config.robustness_scales {
        let (dataset, candidates) = provider(scale);
        let report = engine.run(&dataset, &candidates)?;
        let n_hits = report
            .p_values
            .iter()
            .filter(|p| p.p_raw < threshold)
            .count();
        let hit_rate = n_hits as f64 / report.n_tests as f64;
        info!(
            "robustness scale {scale}: {n_hits}/{} hits (rate {hit_rate:.4})",
            report.n_tests
        );
        outcomes.push(ScaleOutcome {
            scale,
            n_tests: report.n_tests,
            n_hits,
            hit_rate,
            rarity_bits: rarity_bits(hit_rate),
        });
    }

    let rates: Vec<f64> = outcomes.iter().map(|o| o.hit_rate).collect();
    let (spread, ratio, verdict) = assess(
        &rates,
        config.robustness_tolerance,
        config.robustness_ratio_bound,
    );
    info!("robustness verdict: {verdict} (spread {spread:.4})");

    Ok(RobustnessReport {
        outcomes,
        hit_rate_spread: spread,
        hit_rate_ratio: ratio,
        verdict,
    })
}

/// `-log2(hit_rate)`, undefined at zero.
pub fn rarity_bits(hit_rate: f64) -> Option<f64> {
    if hit_rate > 0.0 {
        Some(-hit_rate.log2())
    } else {
        None
    }
}

/// Verdict from per-scale hit rates: STABLE iff the spread (max - min) stays
/// below `tolerance` and the max/min ratio stays below `ratio_bound`. A
/// sweep where every scale hit zero is stable (ratio taken as 1); zero at
/// some scales but not others is an infinite ratio and therefore unstable.
pub fn assess(
    hit_rates: &[f64],
    tolerance: f64,
    ratio_bound: f64,
) -> (f64, Option<f64>, RobustnessVerdict) {
    let max = hit_rates.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = hit_rates.iter().copied().fold(f64::INFINITY, f64::min);
    let spread = max - min;

    let ratio = if min > 0.0 {
        Some(max / min)
    } else if max == 0.0 {
        Some(1.0)
    } else {
        None
    };

    let stable = spread < tolerance && matches!(ratio, Some(r) if r < ratio_bound);
    let verdict = if stable {
        RobustnessVerdict::Stable
    } else {
        RobustnessVerdict::Unstable
    };
    (spread, ratio, verdict)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tight_hit_rates_are_stable() {
        let (spread, ratio, verdict) = assess(&[0.04, 0.05, 0.045], 0.02, 2.0);
        assert!((spread - 0.01).abs() < 1e-12);
        assert!((ratio.unwrap() - 1.25).abs() < 1e-12);
        assert_eq!(verdict, RobustnessVerdict::Stable);
    }

    #[test]
    fn wild_hit_rates_are_unstable() {
        let (spread, ratio, verdict) = assess(&[0.01, 0.05, 0.40], 0.02, 2.0);
        assert!((spread - 0.39).abs() < 1e-12);
        assert!((ratio.unwrap() - 40.0).abs() < 1e-12);
        assert_eq!(verdict, RobustnessVerdict::Unstable);
    }

    #[test]
    fn all_zero_rates_are_stable() {
        let (spread, ratio, verdict) = assess(&[0.0, 0.0, 0.0], 0.02, 2.0);
        assert_eq!(spread, 0.0);
        assert_eq!(ratio, Some(1.0));
        assert_eq!(verdict, RobustnessVerdict::Stable);
    }

    #[test]
    fn partial_zero_rates_are_unstable() {
        // Spread within tolerance, but ratio is infinite.
        let (_, ratio, verdict) = assess(&[0.0, 0.01], 0.02, 2.0);
        assert_eq!(ratio, None);
        assert_eq!(verdict, RobustnessVerdict::Unstable);
    }

    #[test]
    fn rarity_bits_values() {
        assert_eq!(rarity_bits(0.0), None);
        assert!((rarity_bits(0.5).unwrap() - 1.0).abs() < 1e-12);
        assert!((rarity_bits(0.03125).unwrap() - 5.0).abs() < 1e-12);
    }
}
