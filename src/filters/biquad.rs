//! Second-order sections: peak filters, cascade convolution and
//! factorisation of canonical filters into cascades.

use std::f64::consts::PI;

use nalgebra::DMatrix;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::FilterCoefficients;
use crate::error::{Result, WaveguideError};

/// Imaginary parts below this (relative to the root magnitude) count as real.
const REAL_ROOT_TOLERANCE: f64 = 1e-9;

/// One second-order section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiquadCoefficients {
    pub b: [f64; 3],
    pub a: [f64; 3],
}

impl BiquadCoefficients {
    pub const IDENTITY: Self = Self {
        b: [1.0, 0.0, 0.0],
        a: [1.0, 0.0, 0.0],
    };

    /// RBJ cookbook peaking filter.
    ///
    /// `centre` is normalised to Nyquist (0..1). A 0 dB peak has identical
    /// numerator and denominator.
    pub fn peak(gain_db: f64, centre: f64, q: f64) -> Self {
        let w0 = PI * centre;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);
        let big_a = 10.0_f64.powf(gain_db / 40.0);

        Self {
            b: [1.0 + alpha * big_a, -2.0 * cos_w0, 1.0 - alpha * big_a],
            a: [1.0 + alpha / big_a, -2.0 * cos_w0, 1.0 - alpha / big_a],
        }
    }

    pub fn to_canonical(&self) -> FilterCoefficients {
        FilterCoefficients {
            b: self.b.to_vec(),
            a: self.a.to_vec(),
        }
    }
}

/// Peak filter descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakDescriptor {
    pub gain_db: f64,
    /// Centre frequency normalised to Nyquist.
    pub centre: f64,
    pub q: f64,
}

/// Multiply two polynomials.
fn poly_mul(lhs: &[f64], rhs: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; lhs.len() + rhs.len() - 1];
    for (i, l) in lhs.iter().enumerate() {
        for (j, r) in rhs.iter().enumerate() {
            out[i + j] += l * r;
        }
    }
    out
}

/// Product of a chain of sections as one canonical filter.
pub fn convolve(sections: &[BiquadCoefficients]) -> FilterCoefficients {
    sections.iter().fold(
        FilterCoefficients {
            b: vec![1.0],
            a: vec![1.0],
        },
        |acc, s| FilterCoefficients {
            b: poly_mul(&acc.b, &s.b),
            a: poly_mul(&acc.a, &s.a),
        },
    )
}

/// Canonical filter made of one peak section per descriptor.
pub fn peak_cascade(peaks: &[PeakDescriptor]) -> FilterCoefficients {
    let sections: Vec<_> = peaks
        .iter()
        .map(|p| BiquadCoefficients::peak(p.gain_db, p.centre, p.q))
        .collect();
    convolve(&sections).normalised()
}

/// Chain of second-order sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiquadCascade {
    pub sections: Vec<BiquadCoefficients>,
}

impl BiquadCascade {
    pub fn new(sections: Vec<BiquadCoefficients>) -> Self {
        Self { sections }
    }

    pub fn to_canonical(&self) -> FilterCoefficients {
        convolve(&self.sections)
    }

    /// Split a canonical filter into `ceil(order / 2)` sections.
    ///
    /// Numerator and denominator roots are found independently and paired
    /// into quadratics (conjugate pairs together, real roots in sorted
    /// order). The overall gain goes into the first section.
    pub fn from_canonical(filter: &FilterCoefficients) -> Result<Self> {
        let filter = filter.normalised();
        let a0 = filter.a.first().copied().unwrap_or(0.0);
        if a0 != 1.0 {
            return Err(WaveguideError::Factorisation {
                message: "denominator has no leading coefficient".to_string(),
            });
        }

        let count = filter.order().div_ceil(2).max(1);
        let den = quadratics(&filter.a, count)?;
        let b0 = filter.b.first().copied().unwrap_or(0.0);
        let (gain, num) = if filter.b.iter().all(|&c| c == 0.0) {
            (0.0, vec![[1.0, 0.0, 0.0]; count])
        } else if b0 == 0.0 {
            return Err(WaveguideError::Factorisation {
                message: "numerator has a zero leading coefficient".to_string(),
            });
        } else {
            let monic: Vec<f64> = filter.b.iter().map(|c| c / b0).collect();
            (b0, quadratics(&monic, count)?)
        };

        let mut sections: Vec<BiquadCoefficients> = num
            .into_iter()
            .zip(den)
            .map(|(b, a)| BiquadCoefficients { b, a })
            .collect();
        for c in sections[0].b.iter_mut() {
            *c *= gain;
        }
        Ok(Self { sections })
    }
}

/// Roots of `1 + c[1] z^-1 + ... + c[n] z^-n`, i.e. of
/// `z^n + c[1] z^(n-1) + ... + c[n]`.
fn roots(monic: &[f64]) -> Vec<Complex64> {
    let mut coeffs = monic.to_vec();
    while coeffs.len() > 1 && coeffs[coeffs.len() - 1] == 0.0 {
        coeffs.pop();
    }
    let trailing_zeros = monic.len() - coeffs.len();
    let n = coeffs.len() - 1;

    let mut found: Vec<Complex64> = if n == 0 {
        Vec::new()
    } else {
        let companion = DMatrix::from_fn(n, n, |row, col| {
            if row == 0 {
                -coeffs[col + 1]
            } else if row == col + 1 {
                1.0
            } else {
                0.0
            }
        });
        companion.complex_eigenvalues().iter().copied().collect()
    };
    found.extend(std::iter::repeat(Complex64::new(0.0, 0.0)).take(trailing_zeros));
    found
}

/// Group the roots of a monic polynomial into `count` quadratics in `z^-1`.
fn quadratics(monic: &[f64], count: usize) -> Result<Vec<[f64; 3]>> {
    let all = roots(monic);
    if all.iter().any(|r| !r.re.is_finite() || !r.im.is_finite()) {
        return Err(WaveguideError::Factorisation {
            message: "root finding produced non-finite values".to_string(),
        });
    }

    let is_real = |r: &Complex64| r.im.abs() <= REAL_ROOT_TOLERANCE * r.norm().max(1.0);
    let mut real: Vec<f64> = all.iter().filter(|r| is_real(r)).map(|r| r.re).collect();
    let upper: Vec<&Complex64> = all.iter().filter(|r| !is_real(r) && r.im > 0.0).collect();
    let lower = all.iter().filter(|r| !is_real(r) && r.im < 0.0).count();
    if upper.len() != lower {
        return Err(WaveguideError::Factorisation {
            message: format!(
                "{} roots above the real axis but {} below",
                upper.len(),
                lower
            ),
        });
    }
    real.sort_by(|a, b| a.total_cmp(b));

    let mut out: Vec<[f64; 3]> = upper
        .iter()
        .map(|r| [1.0, -2.0 * r.re, r.norm_sqr()])
        .collect();
    for pair in real.chunks(2) {
        out.push(match pair {
            [r1, r2] => [1.0, -(r1 + r2), r1 * r2],
            [r] => [1.0, -r, 0.0],
            _ => [1.0, 0.0, 0.0],
        });
    }
    if out.len() > count {
        return Err(WaveguideError::Factorisation {
            message: format!("{} sections needed, {} available", out.len(), count),
        });
    }
    out.resize(count, [1.0, 0.0, 0.0]);
    Ok(out)
}
