//! Monte-Carlo significance engine.
//!
//! Orchestrates the observed ranking, the surrogate null distribution, and
//! the empirical/multiple-testing-corrected p-values. Null iterations are
//! embarrassingly parallel: each derives its own RNG from `seed0 + i` and
//! shares only read-only references to the observed data and configuration,
//! so parallel execution never changes the output.

use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use std::collections::BTreeMap;

use crate::circular::{self, CircularSummary, PairwisePhaseDelta, PhaseMeasurement};
use crate::config::EngineConfig;
use crate::criterion::Criterion;
use crate::dataset::{Candidate, Dataset};
use crate::error::{EngineError, EngineResult};
use crate::rank::{self, RankedCandidate};
use crate::standardize;
use crate::surrogate;

/// Run phase, logged at each transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunPhase {
    Idle,
    Running,
    Aggregating,
    Done,
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Aggregating => write!(f, "aggregating"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Empirical and corrected significance for one candidate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PValueResult {
    pub candidate: Candidate,
    pub observed_score: f64,
    /// `(#{null >= observed} + 1) / (n_null + 1)` — strictly in (0, 1].
    pub p_raw: f64,
    /// Bonferroni: `min(p_raw * n_tests, 1.0)` over the full candidate count.
    pub p_corrected: f64,
    /// Gaussian-approximation z of the observed score against the null
    /// sample; diagnostic cross-check only. `None` when the null is flat.
    pub z_null: Option<f64>,
    /// One-sided analytic p for `z_null`.
    pub p_gaussian: Option<f64>,
}

/// Circular-statistics block for one phase-valued criterion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircularReport {
    pub criterion: String,
    pub summary: CircularSummary,
    pub pairwise: Vec<PairwisePhaseDelta>,
}

/// Everything one significance run produces. Persisting this (CSV/JSON/
/// Markdown) is a collaborator concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignificanceReport {
    pub n_iterations: usize,
    pub seed0: u64,
    /// Bonferroni correction factor: the full enumerated candidate count.
    pub n_tests: usize,
    /// Observed ranking, best first.
    pub ranking: Vec<RankedCandidate>,
    /// One entry per candidate, in ranking order.
    pub p_values: Vec<PValueResult>,
    /// One entry per circular criterion that produced measurements.
    pub circular: Vec<CircularReport>,
}

/// Multi-criterion ranking and Monte-Carlo significance engine.
///
/// Owns a validated configuration and the criterion set for one use case.
/// `run` is `&self` and holds no mutable state, so one engine can serve
/// repeated runs (the robustness sweep relies on this).
pub struct SignificanceEngine {
    config: EngineConfig,
    criteria: Vec<Box<dyn Criterion>>,
}

impl std::fmt::Debug for SignificanceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignificanceEngine")
            .field("config", &self.config)
            .field("criteria", &format_args!("[{} criteria]", self.criteria.len()))
            .finish()
    }
}

impl SignificanceEngine {
    /// Build an engine. The configuration is validated here, once; components
    /// downstream trust it.
    pub fn new(config: EngineConfig, criteria: Vec<Box<dyn Criterion>>) -> EngineResult<Self> {
        config.validate()?;
        if criteria.is_empty() {
            return Err(EngineError::InvalidConfig(
                "at least one criterion is required".to_string(),
            ));
        }
        Ok(Self { config, criteria })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute one full significance run against the observed dataset.
    ///
    /// Exactly `n_iterations` null iterations complete, or the run fails with
    /// the first iteration's error — a partial null distribution is never
    /// reported as complete.
    pub fn run(
        &self,
        dataset: &Dataset,
        candidates: &[Candidate],
    ) -> EngineResult<SignificanceReport> {
        let n_iterations = self.config.n_iterations;
        if n_iterations == 0 {
            return Err(EngineError::InsufficientNullSamples { requested: 0 });
        }
        if candidates.is_empty() {
            return Err(EngineError::InvalidConfig(
                "candidate population is empty".to_string(),
            ));
        }

        let mut phase = RunPhase::Idle;
        debug!("significance run: {phase}, {} candidates", candidates.len());

        // Observed pipeline.
        let observed_scores = self.combined_scores_for(dataset, candidates)?;
        let ranking = rank::rank(&observed_scores);

        phase = RunPhase::Running;
        info!(
            "significance run: {phase}, {n_iterations} null iterations from seed {}",
            self.config.seed0
        );

        // Null distribution: iteration i is a pure function of seed0 + i.
        let null_scores: Vec<BTreeMap<Candidate, f64>> = (0..n_iterations)
            .into_par_iter()
            .map(|i| {
                let seed = self.config.seed0.wrapping_add(i as u64);
                let wrap = |source: EngineError| EngineError::NullIteration {
                    iteration: i,
                    seed,
                    source: Box::new(source),
                };
                let surrogate_data = surrogate::generate(dataset, seed).map_err(wrap)?;
                self.combined_scores_for(&surrogate_data, candidates)
                    .map_err(wrap)
            })
            .collect::<EngineResult<Vec<_>>>()?;

        phase = RunPhase::Aggregating;
        debug!("significance run: {phase}");

        // Every iteration scored every candidate, so each per-candidate null
        // vector has length n_iterations exactly.
        let n_tests = candidates.len();
        let p_values: Vec<PValueResult> = ranking
            .iter()
            .map(|rc| {
                let observed = rc.combined_score;
                let nulls: Vec<f64> = null_scores
                    .iter()
                    .map(|scores| scores[&rc.candidate])
                    .collect();
                debug_assert_eq!(nulls.len(), n_iterations);
                p_value_for(rc.candidate, observed, &nulls, n_tests)
            })
            .collect();

        let circular = self.circular_reports(dataset, candidates);

        phase = RunPhase::Done;
        info!(
            "significance run: {phase}, best p_raw = {:.4}",
            p_values
                .iter()
                .map(|p| p.p_raw)
                .fold(f64::INFINITY, f64::min)
        );

        Ok(SignificanceReport {
            n_iterations,
            seed0: self.config.seed0,
            n_tests,
            ranking,
            p_values,
            circular,
        })
    }

    /// Evaluator → standardizer → combiner for one dataset instance.
    ///
    /// Circular criteria are excluded from the linear combination (an angle
    /// has no meaningful z-score) and surface through the circular block
    /// instead. A criterion that applies to no candidate of this dataset is
    /// skipped; one that applies but is degenerate aborts the run.
    fn combined_scores_for(
        &self,
        dataset: &Dataset,
        candidates: &[Candidate],
    ) -> EngineResult<BTreeMap<Candidate, f64>> {
        let mut zscores: BTreeMap<String, BTreeMap<Candidate, f64>> = BTreeMap::new();
        for criterion in self.criteria.iter().filter(|c| !c.circular()) {
            let raw: BTreeMap<Candidate, f64> = candidates
                .iter()
                .filter_map(|c| criterion.evaluate(c, dataset).map(|v| (*c, v)))
                .collect();
            if raw.is_empty() {
                debug!("criterion {} not applicable, skipped", criterion.name());
                continue;
            }
            let z = standardize::zscores(criterion.name(), &raw)?;
            zscores.insert(criterion.name().to_string(), z);
        }
        Ok(rank::combined_scores(
            candidates,
            &zscores,
            &self.config.weights,
        ))
    }

    /// Circular aggregation for every phase-valued criterion.
    fn circular_reports(&self, dataset: &Dataset, candidates: &[Candidate]) -> Vec<CircularReport> {
        self.criteria
            .iter()
            .filter(|c| c.circular())
            .filter_map(|criterion| {
                let measurements: Vec<PhaseMeasurement> = candidates
                    .iter()
                    .filter_map(|c| {
                        criterion.evaluate(c, dataset).map(|phase| PhaseMeasurement {
                            source_label: c.to_string(),
                            phase_rad: phase,
                            amplitude: 1.0,
                            weight: 1.0,
                        })
                    })
                    .collect();
                let summary = circular::circular_summary(&measurements)?;
                Some(CircularReport {
                    criterion: criterion.name().to_string(),
                    summary,
                    pairwise: circular::pairwise_differences(&measurements),
                })
            })
            .collect()
    }
}

/// Empirical p with add-one continuity correction, Bonferroni correction,
/// and the Gaussian cross-check against the null sample.
fn p_value_for(
    candidate: Candidate,
    observed: f64,
    nulls: &[f64],
    n_tests: usize,
) -> PValueResult {
    let n_null = nulls.len();
    let exceed = nulls.iter().filter(|&&v| v >= observed).count();
    let p_raw = (exceed + 1) as f64 / (n_null + 1) as f64;
    let p_corrected = (p_raw * n_tests as f64).min(1.0);

    let nf = n_null as f64;
    let mean = nulls.iter().sum::<f64>() / nf;
    let var = nulls.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / nf;
    let std = var.sqrt();
    let (z_null, p_gaussian) = if std > 0.0 {
        let z = (observed - mean) / std;
        let normal = Normal::standard();
        (Some(z), Some(normal.sf(z)))
    } else {
        (None, None)
    };

    PValueResult {
        candidate,
        observed_score: observed,
        p_raw,
        p_corrected,
        z_null,
        p_gaussian,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criterion::MeanShift;
    use crate::dataset::SeriesSet;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn series_engine(n_iterations: usize, seed0: u64) -> SignificanceEngine {
        let mut config = EngineConfig {
            n_iterations,
            seed0,
            ..EngineConfig::default()
        };
        config.weights.insert("mean_shift".to_string(), 1.0);
        SignificanceEngine::new(config, vec![Box::new(MeanShift::default())]).unwrap()
    }

    fn noisy_series(len: usize, offset: f64, seed: u64) -> Vec<f64> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..len)
            .map(|_| offset + rng.random::<f64>() - 0.5)
            .collect()
    }

    fn three_channel_dataset() -> (Dataset, Vec<Candidate>) {
        let mut set = SeriesSet::new();
        set.insert(Candidate::Channel(1), noisy_series(64, 2.0, 10));
        set.insert(Candidate::Channel(2), noisy_series(64, 0.0, 11));
        set.insert(Candidate::Channel(3), noisy_series(64, -2.0, 12));
        let candidates = set.keys().copied().collect();
        (Dataset::Series(set), candidates)
    }

    #[test]
    fn empty_criteria_rejected() {
        let mut config = EngineConfig::default();
        config.weights.insert("x".to_string(), 1.0);
        assert!(SignificanceEngine::new(config, vec![]).is_err());
    }

    #[test]
    fn run_produces_full_report() {
        let engine = series_engine(49, 7);
        let (data, candidates) = three_channel_dataset();
        let report = engine.run(&data, &candidates).unwrap();
        assert_eq!(report.n_iterations, 49);
        assert_eq!(report.n_tests, 3);
        assert_eq!(report.ranking.len(), 3);
        assert_eq!(report.p_values.len(), 3);
        // Strong positive offset ranks first.
        assert_eq!(report.ranking[0].candidate, Candidate::Channel(1));
    }

    #[test]
    fn p_raw_in_open_unit_interval_and_bonferroni_bounded() {
        let engine = series_engine(29, 3);
        let (data, candidates) = three_channel_dataset();
        let report = engine.run(&data, &candidates).unwrap();
        for p in &report.p_values {
            assert!(p.p_raw > 0.0 && p.p_raw <= 1.0);
            assert!(p.p_corrected >= p.p_raw);
            assert!(p.p_corrected <= 1.0);
        }
    }

    #[test]
    fn deterministic_for_fixed_seed() {
        let (data, candidates) = three_channel_dataset();
        let a = series_engine(25, 99).run(&data, &candidates).unwrap();
        let b = series_engine(25, 99).run(&data, &candidates).unwrap();
        let pa: Vec<(f64, f64)> = a.p_values.iter().map(|p| (p.p_raw, p.p_corrected)).collect();
        let pb: Vec<(f64, f64)> = b.p_values.iter().map(|p| (p.p_raw, p.p_corrected)).collect();
        assert_eq!(pa, pb);
    }

    #[test]
    fn different_seed_changes_null() {
        let (data, candidates) = three_channel_dataset();
        let a = series_engine(50, 1).run(&data, &candidates).unwrap();
        let b = series_engine(50, 2).run(&data, &candidates).unwrap();
        // Rankings agree (observed data unchanged) ...
        assert_eq!(a.ranking[0].candidate, b.ranking[0].candidate);
        // ... but the null draws differ somewhere.
        let pa: Vec<f64> = a.p_values.iter().map(|p| p.p_raw).collect();
        let pb: Vec<f64> = b.p_values.iter().map(|p| p.p_raw).collect();
        assert!(
            pa != pb || a.p_values[0].z_null != b.p_values[0].z_null,
            "independent seeds produced identical nulls"
        );
    }

    #[test]
    fn p_value_minimum_when_observed_above_all_nulls() {
        let nulls: Vec<f64> = (0..99).map(|i| i as f64 / 100.0).collect();
        let result = p_value_for(Candidate::Channel(1), 10.0, &nulls, 5);
        assert!((result.p_raw - 1.0 / 100.0).abs() < 1e-15);
        assert!((result.p_corrected - 5.0 / 100.0).abs() < 1e-15);
    }

    #[test]
    fn bonferroni_saturates_at_one() {
        let nulls = vec![1.0; 9];
        let result = p_value_for(Candidate::Channel(1), 0.0, &nulls, 50);
        assert_eq!(result.p_raw, 1.0);
        assert_eq!(result.p_corrected, 1.0);
    }

    #[test]
    fn flat_null_has_no_gaussian_cross_check() {
        let nulls = vec![2.5; 10];
        let result = p_value_for(Candidate::Channel(1), 3.0, &nulls, 1);
        assert!(result.z_null.is_none());
        assert!(result.p_gaussian.is_none());
    }
}
