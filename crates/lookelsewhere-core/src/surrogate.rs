//! Surrogate ("no signal") dataset generation.
//!
//! A surrogate destroys the structure the test is designed to detect while
//! preserving a declared invariant of the observed data. Two strategies:
//!
//! - **Phase randomization** for harmonic data: every `m >= 1` mode keeps its
//!   amplitude exactly and receives an independent uniform phase; `m = 0`
//!   modes stay real with their sign preserved. The per-degree power spectrum
//!   of the surrogate equals the original's — a checkable postcondition, not
//!   a tunable.
//! - **Marginal resampling** for series data: every candidate's samples are
//!   redrawn from a Gaussian matched to the observed mean and variance,
//!   destroying periodic and cross-candidate structure.
//!
//! Every generation call takes an explicit seed and constructs its own RNG;
//! the same seed and input produce bit-identical output.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use rustfft::num_complex::Complex;
use std::f64::consts::TAU;

use crate::dataset::{Dataset, HarmonicMap, SeriesSet};
use crate::error::{EngineError, EngineResult};

/// Phase-randomized copy of a harmonic map.
///
/// `m = 0` coefficients are real by physical constraint; their only admissible
/// phases are 0 and π, and preserving the sign of the original real part
/// means copying them unchanged.
pub fn phase_randomize(map: &HarmonicMap, seed: u64) -> HarmonicMap {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut out = HarmonicMap::zeros(map.lmax());
    for l in 0..=map.lmax() {
        out.set(l, 0, map.get(l, 0));
        for m in 1..=l {
            let amplitude = map.get(l, m).norm();
            let phase: f64 = rng.random_range(0.0..TAU);
            out.set(
                l,
                m,
                Complex {
                    re: amplitude * phase.cos(),
                    im: amplitude * phase.sin(),
                },
            );
        }
    }
    out
}

/// Moment-matched Gaussian resample of every candidate's series.
///
/// Candidates are visited in identifier order from a single seeded stream, so
/// the output is a deterministic function of `(set, seed)`.
pub fn resample_series(set: &SeriesSet, seed: u64) -> SeriesSet {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    set.iter()
        .map(|(&candidate, series)| {
            let n = series.len();
            if n == 0 {
                return (candidate, Vec::new());
            }
            let nf = n as f64;
            let mean = series.iter().sum::<f64>() / nf;
            let var = series.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / nf;
            // std = 0 collapses the Gaussian to a point mass, which is the
            // correct moment-matched redraw for a constant series.
            let normal = Normal::new(mean, var.sqrt()).expect("finite moments");
            let redrawn: Vec<f64> = (0..n).map(|_| normal.sample(&mut rng)).collect();
            (candidate, redrawn)
        })
        .collect()
}

/// Generate one surrogate for `observed` with the strategy implied by its
/// shape, and verify the structural postcondition.
pub fn generate(observed: &Dataset, seed: u64) -> EngineResult<Dataset> {
    let surrogate = match observed {
        Dataset::Harmonic(map) => Dataset::Harmonic(phase_randomize(map, seed)),
        Dataset::Series(set) => Dataset::Series(resample_series(set, seed)),
    };
    verify_shape(observed, &surrogate)?;
    Ok(surrogate)
}

/// Structural equality check between observed data and a surrogate.
pub fn verify_shape(observed: &Dataset, surrogate: &Dataset) -> EngineResult<()> {
    if !observed.same_shape(surrogate) {
        return Err(EngineError::ShapeMismatch {
            expected: observed.shape_signature(),
            got: surrogate.shape_signature(),
        });
    }
    Ok(())
}

/// Maximum relative per-degree power deviation between two harmonic maps.
///
/// Degrees with zero original power compare by absolute deviation.
pub fn power_spectrum_rel_error(
    original: &HarmonicMap,
    surrogate: &HarmonicMap,
) -> EngineResult<f64> {
    if original.lmax() != surrogate.lmax() {
        return Err(EngineError::ShapeMismatch {
            expected: format!("harmonic(lmax={})", original.lmax()),
            got: format!("harmonic(lmax={})", surrogate.lmax()),
        });
    }
    let mut worst = 0.0f64;
    for (orig, surr) in original
        .power_spectrum()
        .into_iter()
        .zip(surrogate.power_spectrum())
    {
        let err = if orig == 0.0 {
            surr.abs()
        } else {
            ((surr - orig) / orig).abs()
        };
        worst = worst.max(err);
    }
    Ok(worst)
}

/// Assert the phase-randomization invariant: per-degree power preserved to
/// within `tol` relative error. Violation is a generator defect.
pub fn verify_power_preserved(
    original: &HarmonicMap,
    surrogate: &HarmonicMap,
    tol: f64,
) -> EngineResult<()> {
    let worst = power_spectrum_rel_error(original, surrogate)?;
    if worst > tol {
        return Err(EngineError::ShapeMismatch {
            expected: format!("per-degree power within {tol:e} of the original"),
            got: format!("relative deviation {worst:e}"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Candidate;

    fn test_map(lmax: u32, seed: u64) -> HarmonicMap {
        // Deterministic non-trivial coefficients without rand: LCG amplitudes.
        let mut state = seed;
        let mut next = || {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 33) as f64 / (1u64 << 31) as f64 - 0.5
        };
        let mut map = HarmonicMap::zeros(lmax);
        for l in 0..=lmax {
            map.set(l, 0, Complex { re: next() * 10.0, im: 0.0 });
            for m in 1..=l {
                map.set(
                    l,
                    m,
                    Complex {
                        re: next() * 10.0,
                        im: next() * 10.0,
                    },
                );
            }
        }
        map
    }

    #[test]
    fn phase_randomization_preserves_power_spectrum() {
        let map = test_map(16, 0xfeed);
        let surrogate = phase_randomize(&map, 42);
        assert!(verify_power_preserved(&map, &surrogate, 1e-10).is_ok());
    }

    #[test]
    fn phase_randomization_preserves_m0_exactly() {
        let map = test_map(8, 0xbeef);
        let surrogate = phase_randomize(&map, 7);
        for l in 0..=8 {
            assert_eq!(map.get(l, 0), surrogate.get(l, 0));
        }
    }

    #[test]
    fn phase_randomization_changes_phases() {
        let map = test_map(8, 0xbeef);
        let surrogate = phase_randomize(&map, 7);
        let mut changed = 0;
        for l in 1..=8u32 {
            for m in 1..=l {
                if (map.phase(l, m) - surrogate.phase(l, m)).abs() > 1e-6 {
                    changed += 1;
                }
            }
        }
        assert!(changed > 30, "only {changed} phases moved");
    }

    #[test]
    fn same_seed_is_bit_identical() {
        let map = test_map(12, 0xabc);
        assert_eq!(phase_randomize(&map, 99), phase_randomize(&map, 99));

        let mut set = SeriesSet::new();
        set.insert(Candidate::Channel(3), vec![1.0, 2.0, 3.0, 4.0]);
        set.insert(Candidate::Channel(9), vec![-1.0, 0.0, 1.0]);
        assert_eq!(resample_series(&set, 5), resample_series(&set, 5));
    }

    #[test]
    fn different_seeds_differ() {
        let map = test_map(12, 0xabc);
        assert_ne!(phase_randomize(&map, 1), phase_randomize(&map, 2));
    }

    #[test]
    fn resampled_series_keeps_shape_and_moments() {
        let mut set = SeriesSet::new();
        let series: Vec<f64> = (0..4000).map(|i| 5.0 + (i % 13) as f64).collect();
        set.insert(Candidate::Channel(1), series.clone());
        let redrawn = resample_series(&set, 11);
        let out = &redrawn[&Candidate::Channel(1)];
        assert_eq!(out.len(), series.len());

        let nf = series.len() as f64;
        let mean_in = series.iter().sum::<f64>() / nf;
        let mean_out = out.iter().sum::<f64>() / nf;
        let var_in = series.iter().map(|x| (x - mean_in).powi(2)).sum::<f64>() / nf;
        let var_out = out.iter().map(|x| (x - mean_out).powi(2)).sum::<f64>() / nf;
        assert!((mean_in - mean_out).abs() < 0.3, "means {mean_in} vs {mean_out}");
        assert!(
            (var_in - var_out).abs() / var_in < 0.1,
            "vars {var_in} vs {var_out}"
        );
    }

    #[test]
    fn generate_dispatches_and_checks_shape() {
        let data = Dataset::Harmonic(test_map(6, 1));
        let surrogate = generate(&data, 3).unwrap();
        assert!(data.same_shape(&surrogate));

        let mut set = SeriesSet::new();
        set.insert(Candidate::Channel(2), vec![0.5; 32]);
        let data = Dataset::Series(set);
        let surrogate = generate(&data, 3).unwrap();
        assert!(data.same_shape(&surrogate));
    }
}
