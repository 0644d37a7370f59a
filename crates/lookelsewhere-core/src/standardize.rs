//! Population z-scores for one criterion.
//!
//! Standardization is relative to the candidate population of the same run,
//! never to an external reference. Pure and deterministic: identical input
//! maps produce identical z-score maps.

use std::collections::BTreeMap;

use crate::dataset::Candidate;
use crate::error::{EngineError, EngineResult};

/// Convert raw criterion values into z-scores against their own population.
///
/// Uses the population (ddof = 0) standard deviation. A population smaller
/// than 2, or one with exactly zero variance, is rejected with
/// [`EngineError::DegenerateCriterion`] — silently mapping a flat criterion
/// to all-zero z-scores would let an uninformative criterion pose as
/// "perfectly average" in the combined ranking.
pub fn zscores(
    criterion: &str,
    raw: &BTreeMap<Candidate, f64>,
) -> EngineResult<BTreeMap<Candidate, f64>> {
    let n = raw.len();
    if n < 2 {
        return Err(EngineError::DegenerateCriterion {
            criterion: criterion.to_string(),
            population: n,
        });
    }

    let nf = n as f64;
    let mean = raw.values().sum::<f64>() / nf;
    let var = raw.values().map(|v| (v - mean) * (v - mean)).sum::<f64>() / nf;
    let std = var.sqrt();
    if std == 0.0 {
        return Err(EngineError::DegenerateCriterion {
            criterion: criterion.to_string(),
            population: n,
        });
    }

    Ok(raw
        .iter()
        .map(|(&c, &v)| (c, (v - mean) / std))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pop(values: &[(u64, f64)]) -> BTreeMap<Candidate, f64> {
        values
            .iter()
            .map(|&(id, v)| (Candidate::Channel(id), v))
            .collect()
    }

    #[test]
    fn zscores_have_zero_mean_unit_std() {
        let raw = pop(&[(1, 10.0), (2, 0.0), (3, -10.0)]);
        let z = zscores("test", &raw).unwrap();
        let mean: f64 = z.values().sum::<f64>() / 3.0;
        let var: f64 = z.values().map(|v| v * v).sum::<f64>() / 3.0;
        assert!(mean.abs() < 1e-12);
        assert!((var - 1.0).abs() < 1e-12);
        assert!(z[&Candidate::Channel(1)] > 0.0);
        assert!(z[&Candidate::Channel(3)] < 0.0);
    }

    #[test]
    fn identical_values_rejected() {
        let raw = pop(&[(1, 5.0), (2, 5.0), (3, 5.0)]);
        let err = zscores("flat", &raw);
        assert!(matches!(
            err,
            Err(EngineError::DegenerateCriterion { population: 3, .. })
        ));
    }

    #[test]
    fn population_of_one_rejected() {
        let raw = pop(&[(1, 5.0)]);
        assert!(matches!(
            zscores("tiny", &raw),
            Err(EngineError::DegenerateCriterion { population: 1, .. })
        ));
    }

    #[test]
    fn deterministic_across_calls() {
        let raw = pop(&[(1, 3.5), (2, -1.25), (3, 0.75), (4, 12.0)]);
        let a = zscores("repeat", &raw).unwrap();
        let b = zscores("repeat", &raw).unwrap();
        assert_eq!(a, b);
    }
}
