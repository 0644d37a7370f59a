//! Candidate identifiers and the two dataset shapes the engine consumes.
//!
//! Harmonic datasets hold spherical-harmonic coefficients `a_lm` indexed by
//! `(degree, order)` up to a declared `lmax`, with `order = 0` coefficients
//! real. Series datasets hold one scalar sample vector per candidate. Loading
//! either from disk is a collaborator concern; this module only defines the
//! in-memory model.

use rustfft::num_complex::Complex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{EngineError, EngineResult};

/// Unit under test in a ranking/significance run. Immutable once enumerated.
///
/// The derived `Ord` (variant, then fields, ascending) is the deterministic
/// tie-break key used everywhere candidates are sorted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Candidate {
    /// Integer channel from a scan range.
    Channel(u64),
    /// Labeled harmonic mode.
    Mode { degree: u32, order: i32 },
}

impl std::fmt::Display for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Channel(n) => write!(f, "channel_{n}"),
            Self::Mode { degree, order } => write!(f, "mode_l{degree}_m{order}"),
        }
    }
}

/// Spherical-harmonic coefficient array up to `lmax`.
///
/// Coefficients are stored triangularly for `0 <= m <= l` (real-field
/// convention; negative orders are determined by conjugation and never
/// stored). The `m = 0` coefficient of every degree must be real.
#[derive(Debug, Clone, PartialEq)]
pub struct HarmonicMap {
    lmax: u32,
    coeffs: Vec<Complex<f64>>,
}

/// Tolerance for the `m = 0` realness check on input coefficients.
const M0_IMAG_TOL: f64 = 1e-12;

impl HarmonicMap {
    /// All-zero map up to `lmax`.
    pub fn zeros(lmax: u32) -> Self {
        let n = Self::coeff_count(lmax);
        Self {
            lmax,
            coeffs: vec![Complex { re: 0.0, im: 0.0 }; n],
        }
    }

    /// Build from a triangular coefficient vector (degree-major, order
    /// ascending). Rejects length mismatches and non-real `m = 0` entries.
    pub fn from_coeffs(lmax: u32, coeffs: Vec<Complex<f64>>) -> EngineResult<Self> {
        let expected = Self::coeff_count(lmax);
        if coeffs.len() != expected {
            return Err(EngineError::ShapeMismatch {
                expected: format!("{expected} coefficients for lmax={lmax}"),
                got: format!("{} coefficients", coeffs.len()),
            });
        }
        for l in 0..=lmax {
            let c = coeffs[Self::index(l, 0)];
            if c.im.abs() > M0_IMAG_TOL {
                return Err(EngineError::ShapeMismatch {
                    expected: format!("real m=0 coefficient at degree {l}"),
                    got: format!("imaginary part {:e}", c.im),
                });
            }
        }
        Ok(Self { lmax, coeffs })
    }

    fn coeff_count(lmax: u32) -> usize {
        let l = lmax as usize;
        (l + 1) * (l + 2) / 2
    }

    fn index(l: u32, m: u32) -> usize {
        let l = l as usize;
        l * (l + 1) / 2 + m as usize
    }

    pub fn lmax(&self) -> u32 {
        self.lmax
    }

    /// Coefficient `a_lm` for `0 <= m <= l <= lmax`.
    pub fn get(&self, l: u32, m: u32) -> Complex<f64> {
        debug_assert!(l <= self.lmax && m <= l);
        self.coeffs[Self::index(l, m)]
    }

    pub fn set(&mut self, l: u32, m: u32, value: Complex<f64>) {
        debug_assert!(l <= self.lmax && m <= l);
        self.coeffs[Self::index(l, m)] = value;
    }

    /// Angular power of one degree:
    /// `C_l = (|a_l0|^2 + 2 * sum_{m=1}^{l} |a_lm|^2) / (2l + 1)`.
    ///
    /// The factor 2 accounts for the unstored negative orders.
    pub fn degree_power(&self, l: u32) -> f64 {
        let mut sum = self.get(l, 0).norm_sqr();
        for m in 1..=l {
            sum += 2.0 * self.get(l, m).norm_sqr();
        }
        sum / (2.0 * l as f64 + 1.0)
    }

    /// Power spectrum `C_0 ..= C_lmax`.
    pub fn power_spectrum(&self) -> Vec<f64> {
        (0..=self.lmax).map(|l| self.degree_power(l)).collect()
    }

    /// Phase (argument) of `a_lm` in `[-pi, pi]`.
    pub fn phase(&self, l: u32, m: u32) -> f64 {
        self.get(l, m).arg()
    }
}

/// Per-candidate scalar sample vectors.
pub type SeriesSet = BTreeMap<Candidate, Vec<f64>>;

/// One observed (or surrogate) dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum Dataset {
    /// Spherical-harmonic coefficients (phase-coherence use).
    Harmonic(HarmonicMap),
    /// Candidate-indexed scalar series (channel-ranking use).
    Series(SeriesSet),
}

impl Dataset {
    /// Short structural description, used in shape-mismatch errors.
    pub fn shape_signature(&self) -> String {
        match self {
            Self::Harmonic(map) => format!("harmonic(lmax={})", map.lmax()),
            Self::Series(set) => {
                let total: usize = set.values().map(Vec::len).sum();
                format!("series(candidates={}, samples={})", set.len(), total)
            }
        }
    }

    /// True when `other` has the same structural shape: identical `lmax`, or
    /// identical candidate set with identical per-candidate lengths.
    pub fn same_shape(&self, other: &Dataset) -> bool {
        match (self, other) {
            (Self::Harmonic(a), Self::Harmonic(b)) => a.lmax() == b.lmax(),
            (Self::Series(a), Self::Series(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|((ca, va), (cb, vb))| ca == cb && va.len() == vb.len())
            }
            _ => false,
        }
    }
}
