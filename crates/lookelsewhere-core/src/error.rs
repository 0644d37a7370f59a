//! Engine error taxonomy.
//!
//! Leaf failures are never downgraded to warnings: a significance claim built
//! on a partially-failed null distribution is worse than no claim, so every
//! error here aborts the run that produced it.

use thiserror::Error;

/// Crate-wide result alias.
pub type EngineResult<T> = Result<T, EngineError>;

/// All failure modes of the ranking/significance core.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A criterion population had zero variance. Standardizing it would turn
    /// an uninformative criterion into "perfectly average" for every
    /// candidate, so this is surfaced instead of emitting 0 or NaN.
    #[error("degenerate criterion '{criterion}': zero variance across {population} candidates")]
    DegenerateCriterion { criterion: String, population: usize },

    /// Surrogate structure does not match the observed data's structure.
    #[error("shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: String, got: String },

    /// One Monte-Carlo iteration failed. Carries the seed so the failing
    /// surrogate can be regenerated exactly.
    #[error("null iteration {iteration} (seed {seed}) failed: {source}")]
    NullIteration {
        iteration: usize,
        seed: u64,
        source: Box<EngineError>,
    },

    /// A run was requested with no null samples. Defaulting to p = 1.0 would
    /// be a misleading silent success.
    #[error("insufficient null samples: {requested} iterations requested, need at least 1")]
    InsufficientNullSamples { requested: usize },

    /// Configuration rejected at entry.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}
