//! Criterion evaluators.
//!
//! Every statistic computed per candidate implements the [`Criterion`] trait,
//! so the engine never special-cases criterion identity. Evaluators must be
//! pure functions of `(candidate, dataset)` — no hidden state — so observed
//! and null evaluations stay comparable.

use rustfft::{FftPlanner, num_complex::Complex};

use crate::dataset::{Candidate, Dataset};

/// One scalar statistic computed per candidate from data.
pub trait Criterion: Send + Sync {
    /// Stable identifier, also the key into the configured weight map.
    fn name(&self) -> &'static str;

    /// Evaluate the statistic for one candidate. `None` means the criterion
    /// does not apply to this candidate or the data is insufficient; the
    /// combiner zero-fills such entries rather than excluding the candidate.
    fn evaluate(&self, candidate: &Candidate, dataset: &Dataset) -> Option<f64>;

    /// True when values are angles in radians (mod 2π). Circular criteria get
    /// circular-statistics aggregation in the significance report.
    fn circular(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// Harmonic-dataset criteria
// ---------------------------------------------------------------------------

/// Angular power `C_l` of the candidate's degree.
#[derive(Debug, Clone, Copy, Default)]
pub struct DegreePower;

impl Criterion for DegreePower {
    fn name(&self) -> &'static str {
        "degree_power"
    }

    fn evaluate(&self, candidate: &Candidate, dataset: &Dataset) -> Option<f64> {
        let (Candidate::Mode { degree, .. }, Dataset::Harmonic(map)) = (candidate, dataset) else {
            return None;
        };
        if *degree > map.lmax() {
            return None;
        }
        Some(map.degree_power(*degree))
    }
}

/// Phase coherence `R = |mean(exp(i*phase))|` over the `m >= 1` modes of the
/// candidate's degree. 1.0 means perfectly aligned phases, ~0 means
/// incoherent. Degree 0 has no phased modes and yields `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhaseCoherence;

impl Criterion for PhaseCoherence {
    fn name(&self) -> &'static str {
        "phase_coherence"
    }

    fn evaluate(&self, candidate: &Candidate, dataset: &Dataset) -> Option<f64> {
        let (Candidate::Mode { degree, .. }, Dataset::Harmonic(map)) = (candidate, dataset) else {
            return None;
        };
        let l = *degree;
        if l == 0 || l > map.lmax() {
            return None;
        }
        let mut re = 0.0;
        let mut im = 0.0;
        for m in 1..=l {
            let phase = map.phase(l, m);
            re += phase.cos();
            im += phase.sin();
        }
        let n = l as f64;
        Some((re * re + im * im).sqrt() / n)
    }
}

/// Circular mean phase of the candidate degree's `m >= 1` modes, in radians.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanPhase;

impl Criterion for MeanPhase {
    fn name(&self) -> &'static str {
        "mean_phase"
    }

    fn evaluate(&self, candidate: &Candidate, dataset: &Dataset) -> Option<f64> {
        let (Candidate::Mode { degree, .. }, Dataset::Harmonic(map)) = (candidate, dataset) else {
            return None;
        };
        let l = *degree;
        if l == 0 || l > map.lmax() {
            return None;
        }
        let mut re = 0.0;
        let mut im = 0.0;
        for m in 1..=l {
            let phase = map.phase(l, m);
            re += phase.cos();
            im += phase.sin();
        }
        if re == 0.0 && im == 0.0 {
            return None;
        }
        Some(im.atan2(re))
    }

    fn circular(&self) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// Series-dataset criteria
// ---------------------------------------------------------------------------

/// Periodogram excess at the candidate channel's fundamental frequency.
///
/// The candidate `Channel(n)` is read as "period n samples": the series is
/// mean-removed, FFT'd, and the power in the bin nearest `len / n` is
/// normalized by the mean off-DC power. White noise scores ~1, a planted
/// period scores far above.
#[derive(Debug, Clone, Copy)]
pub struct PeriodicComb {
    /// Minimum series length worth transforming.
    pub min_len: usize,
}

impl Default for PeriodicComb {
    fn default() -> Self {
        Self { min_len: 16 }
    }
}

impl Criterion for PeriodicComb {
    fn name(&self) -> &'static str {
        "periodic_comb"
    }

    fn evaluate(&self, candidate: &Candidate, dataset: &Dataset) -> Option<f64> {
        let (Candidate::Channel(period), Dataset::Series(set)) = (candidate, dataset) else {
            return None;
        };
        let series = set.get(candidate)?;
        let n = series.len();
        if n < self.min_len || *period < 2 {
            return None;
        }

        let mean = series.iter().sum::<f64>() / n as f64;
        let mut buffer: Vec<Complex<f64>> = series
            .iter()
            .map(|&x| Complex { re: x - mean, im: 0.0 })
            .collect();

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(n);
        fft.process(&mut buffer);

        let half = n / 2;
        if half < 2 {
            return None;
        }
        let bin = ((n as f64 / *period as f64).round() as usize).clamp(1, half - 1);
        let power: Vec<f64> = buffer[1..half].iter().map(|c| c.norm_sqr()).collect();
        let mean_power = power.iter().sum::<f64>() / power.len() as f64;
        if mean_power <= 0.0 {
            return None;
        }
        Some(power[bin - 1] / mean_power)
    }
}

/// Standardized offset of the candidate's series from zero:
/// `mean / (std / sqrt(n))`. Zero-variance series yield `None`.
#[derive(Debug, Clone, Copy)]
pub struct MeanShift {
    /// Minimum sample count for a meaningful estimate.
    pub min_len: usize,
}

impl Default for MeanShift {
    fn default() -> Self {
        Self { min_len: 2 }
    }
}

impl Criterion for MeanShift {
    fn name(&self) -> &'static str {
        "mean_shift"
    }

    fn evaluate(&self, candidate: &Candidate, dataset: &Dataset) -> Option<f64> {
        let Dataset::Series(set) = dataset else {
            return None;
        };
        let series = set.get(candidate)?;
        let n = series.len();
        if n < self.min_len {
            return None;
        }
        let nf = n as f64;
        let mean = series.iter().sum::<f64>() / nf;
        let var = series.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / nf;
        if var < 1e-300 {
            return None;
        }
        Some(mean / (var.sqrt() / nf.sqrt()))
    }
}
