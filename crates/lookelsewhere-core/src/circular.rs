//! Circular statistics for angle-valued (mod 2π) measurements.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// One phase observation from an independent source (a dataset, an ablation
/// window, or a candidate mode). Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseMeasurement {
    pub source_label: String,
    /// Phase in radians.
    pub phase_rad: f64,
    /// Amplitude of the underlying mode (reported, not used as weight).
    pub amplitude: f64,
    /// Contribution weight in the circular aggregate.
    pub weight: f64,
}

/// Aggregate circular statistics over a set of measurements.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CircularSummary {
    pub n: usize,
    /// Weighted circular mean in `(-pi, pi]`.
    pub mean_rad: f64,
    /// Circular standard deviation `sqrt(-2 ln R)`; infinite at `R = 0`.
    pub std_rad: f64,
    /// Coherence `R = |sum w * exp(i*phase)| / sum w`, in `[0, 1]`.
    pub coherence_r: f64,
    /// Rayleigh uniformity p-value: small when phases are coherent.
    pub rayleigh_p: f64,
}

/// Wrapped difference between two phase measurements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairwisePhaseDelta {
    pub source_a: String,
    pub source_b: String,
    /// `phase_a - phase_b` wrapped into `(-pi, pi]`.
    pub delta_rad: f64,
}

/// Wrap an angle into `(-pi, pi]`.
pub fn wrap_angle(theta: f64) -> f64 {
    let mut t = theta.rem_euclid(2.0 * PI);
    if t > PI {
        t -= 2.0 * PI;
    }
    t
}

/// Weighted circular mean, deviation, coherence, and Rayleigh p-value.
///
/// Returns `None` for an empty set or non-positive total weight.
pub fn circular_summary(measurements: &[PhaseMeasurement]) -> Option<CircularSummary> {
    if measurements.is_empty() {
        return None;
    }
    let total_weight: f64 = measurements.iter().map(|m| m.weight).sum();
    if total_weight <= 0.0 {
        return None;
    }

    let mut re = 0.0;
    let mut im = 0.0;
    for m in measurements {
        re += m.weight * m.phase_rad.cos();
        im += m.weight * m.phase_rad.sin();
    }
    let r = (re * re + im * im).sqrt() / total_weight;
    let r = r.clamp(0.0, 1.0);
    let mean_rad = if r == 0.0 { 0.0 } else { im.atan2(re) };
    let std_rad = if r == 0.0 {
        f64::INFINITY
    } else {
        (-2.0 * r.ln()).max(0.0).sqrt()
    };

    let n = measurements.len();
    Some(CircularSummary {
        n,
        mean_rad,
        std_rad,
        coherence_r: r,
        rayleigh_p: rayleigh_p(n, r),
    })
}

/// Rayleigh test p-value for phase uniformity.
///
/// Uses the standard finite-sample correction (Zar): with `Z = n * R^2`,
/// `p ~= exp(-Z) * (1 + (2Z - Z^2)/(4n) - (24Z - 132Z^2 + 76Z^3 - 9Z^4)/(288 n^2))`.
pub fn rayleigh_p(n: usize, r: f64) -> f64 {
    if n == 0 {
        return 1.0;
    }
    let nf = n as f64;
    let z = nf * r * r;
    let p = (-z).exp()
        * (1.0 + (2.0 * z - z * z) / (4.0 * nf)
            - (24.0 * z - 132.0 * z * z + 76.0 * z.powi(3) - 9.0 * z.powi(4))
                / (288.0 * nf * nf));
    p.clamp(0.0, 1.0)
}

/// All pairwise wrapped phase differences, in input order.
pub fn pairwise_differences(measurements: &[PhaseMeasurement]) -> Vec<PairwisePhaseDelta> {
    let mut deltas = Vec::new();
    for i in 0..measurements.len() {
        for j in (i + 1)..measurements.len() {
            deltas.push(PairwisePhaseDelta {
                source_a: measurements[i].source_label.clone(),
                source_b: measurements[j].source_label.clone(),
                delta_rad: wrap_angle(measurements[i].phase_rad - measurements[j].phase_rad),
            });
        }
    }
    deltas
}
