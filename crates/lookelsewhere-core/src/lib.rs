//! # lookelsewhere-core
//!
//! **Multi-criterion candidate ranking with honest look-elsewhere accounting.**
//!
//! `lookelsewhere-core` ranks scan candidates by several independent
//! statistics and judges the observed ranking against an empirical null
//! distribution built from surrogate data — phase-randomized harmonic maps or
//! moment-matched series redraws — under an explicit, reproducible seed.
//!
//! ## Quick Start
//!
//! ```no_run
//! use lookelsewhere_core::{
//!     Candidate, Dataset, EngineConfig, MeanShift, SeriesSet, SignificanceEngine,
//! };
//!
//! let mut set = SeriesSet::new();
//! set.insert(Candidate::Channel(7), vec![0.4, 0.9, 0.1, 0.7]);
//! set.insert(Candidate::Channel(11), vec![0.0, -0.2, 0.1, -0.1]);
//! let candidates: Vec<Candidate> = set.keys().copied().collect();
//!
//! let mut config = EngineConfig::default();
//! config.weights.insert("mean_shift".to_string(), 1.0);
//!
//! let engine = SignificanceEngine::new(config, vec![Box::new(MeanShift::default())])?;
//! let report = engine.run(&Dataset::Series(set), &candidates)?;
//! println!("best candidate: {}", report.ranking[0].candidate);
//! # Ok::<(), lookelsewhere_core::EngineError>(())
//! ```
//!
//! ## Architecture
//!
//! Criteria → Standardizer → Combiner/Ranker produce the observed ranking;
//! the surrogate generator and significance engine repeat the same pipeline
//! on synthetic "no signal" data to build the null distribution, compute
//! empirical and Bonferroni-corrected p-values, and aggregate circular
//! statistics for phase-valued criteria. The robustness sweep wraps the whole
//! pipeline and re-runs it under perturbed scan scales.
//!
//! Every null iteration derives its RNG from `seed0 + i`: runs are
//! bit-reproducible regardless of worker parallelism. Errors are never
//! downgraded — a partial null distribution aborts the run.

pub mod circular;
pub mod config;
pub mod criterion;
pub mod dataset;
pub mod error;
pub mod rank;
pub mod robustness;
pub mod significance;
pub mod standardize;
pub mod surrogate;

pub use circular::{
    CircularSummary, PairwisePhaseDelta, PhaseMeasurement, circular_summary,
    pairwise_differences, rayleigh_p, wrap_angle,
};
pub use config::EngineConfig;
pub use criterion::{Criterion, DegreePower, MeanPhase, MeanShift, PeriodicComb, PhaseCoherence};
pub use dataset::{Candidate, Dataset, HarmonicMap, SeriesSet};
pub use error::{EngineError, EngineResult};
pub use rank::{RankedCandidate, combined_scores, rank};
pub use robustness::{
    RobustnessReport, RobustnessVerdict, ScaleOutcome, assess, rarity_bits, sweep,
};
pub use significance::{CircularReport, PValueResult, SignificanceEngine, SignificanceReport};
pub use standardize::zscores;
pub use surrogate::{
    generate, phase_randomize, power_spectrum_rel_error, resample_series, verify_power_preserved,
    verify_shape,
};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
