//! Engine configuration.
//!
//! Every recognized option lives here with an explicit default, validated once
//! at entry. Components never reach into loosely-typed maps for thresholds.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{EngineError, EngineResult};

/// Tunable settings for one significance run and its robustness sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of Monte-Carlo null iterations. Must be > 0.
    pub n_iterations: usize,
    /// Base RNG seed; iteration `i` uses `seed0 + i`.
    pub seed0: u64,
    /// Per-criterion weight for the combined score. Weights need not sum to 1.
    pub weights: BTreeMap<String, f64>,
    /// P-value threshold a candidate must cross to count as a hit, in (0, 1).
    pub significance_threshold: f64,
    /// Scale factors applied to the scan parameter during the robustness
    /// sweep. All must be > 0.
    pub robustness_scales: Vec<f64>,
    /// Maximum allowed hit-rate spread (max - min) across scales for a
    /// STABLE verdict.
    pub robustness_tolerance: f64,
    /// Maximum allowed max/min hit-rate ratio across scales for a STABLE
    /// verdict.
    pub robustness_ratio_bound: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            n_iterations: 1000,
            seed0: 0,
            weights: BTreeMap::new(),
            significance_threshold: 0.05,
            robustness_scales: vec![0.8, 1.0, 1.2],
            robustness_tolerance: 0.02,
            robustness_ratio_bound: 2.0,
        }
    }
}

impl EngineConfig {
    /// Validate every option. Called once at run entry; downstream code
    /// trusts the values unconditionally afterwards.
    pub fn validate(&self) -> EngineResult<()> {
        if self.n_iterations == 0 {
            return Err(EngineError::InsufficientNullSamples { requested: 0 });
        }
        if !(self.significance_threshold > 0.0 && self.significance_threshold < 1.0) {
            return Err(EngineError::InvalidConfig(format!(
                "significance_threshold must be in (0, 1), got {}",
                self.significance_threshold
            )));
        }
        if self.weights.is_empty() {
            return Err(EngineError::InvalidConfig(
                "weights must name at least one criterion".to_string(),
            ));
        }
        for (name, &w) in &self.weights {
            if !w.is_finite() {
                return Err(EngineError::InvalidConfig(format!(
                    "weight for '{name}' is not finite"
                )));
            }
        }
        if self.robustness_scales.is_empty() {
            return Err(EngineError::InvalidConfig(
                "robustness_scales must not be empty".to_string(),
            ));
        }
        for &s in &self.robustness_scales {
            if !(s > 0.0) || !s.is_finite() {
                return Err(EngineError::InvalidConfig(format!(
                    "robustness scale must be a finite positive number, got {s}"
                )));
            }
        }
        if !(self.robustness_tolerance > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "robustness_tolerance must be > 0, got {}",
                self.robustness_tolerance
            )));
        }
        if !(self.robustness_ratio_bound > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "robustness_ratio_bound must be > 0, got {}",
                self.robustness_ratio_bound
            )));
        }
        Ok(())
    }

    /// Weight for a criterion name, 0.0 when unlisted.
    pub fn weight(&self, criterion: &str) -> f64 {
        self.weights.get(criterion).copied().unwrap_or(0.0)
    }
}
