//! Weighted combination of standardized criteria into one ranking.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::dataset::Candidate;

/// One candidate's position in the combined ranking.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub candidate: Candidate,
    /// `sum_c weight_c * z_c`; missing criteria contribute 0.0.
    pub combined_score: f64,
    /// 1-based position, best first.
    pub rank: usize,
    /// `(1 - rank / N) * 100`.
    pub percentile: f64,
}

/// Combine per-criterion z-scores into combined scores for a fixed candidate
/// population.
///
/// A candidate missing from some criterion's z-map contributes 0.0 for that
/// term. This is explicit policy, not an error: partially available criteria
/// must not exclude a candidate from the ranking (and must not shrink the
/// multiple-testing population downstream).
pub fn combined_scores(
    candidates: &[Candidate],
    zscores: &BTreeMap<String, BTreeMap<Candidate, f64>>,
    weights: &BTreeMap<String, f64>,
) -> BTreeMap<Candidate, f64> {
    candidates
        .iter()
        .map(|&c| {
            let score: f64 = zscores
                .iter()
                .map(|(name, z)| {
                    let w = weights.get(name).copied().unwrap_or(0.0);
                    w * z.get(&c).copied().unwrap_or(0.0)
                })
                .sum();
            (c, score)
        })
        .collect()
}

/// Rank combined scores: descending score, ties broken by candidate
/// identifier ascending. The comparator is total, so the result does not
/// depend on the sort algorithm's stability guarantees.
pub fn rank(scores: &BTreeMap<Candidate, f64>) -> Vec<RankedCandidate> {
    let mut ordered: Vec<(Candidate, f64)> = scores.iter().map(|(&c, &s)| (c, s)).collect();
    ordered.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    let n = ordered.len() as f64;
    ordered
        .into_iter()
        .enumerate()
        .map(|(i, (candidate, combined_score))| {
            let rank = i + 1;
            RankedCandidate {
                candidate,
                combined_score,
                rank,
                percentile: (1.0 - rank as f64 / n) * 100.0,
            }
        })
        .collect()
}
