//! Boundary filter primitives and design.
//!
//! Filters are rational transfer functions in `z^-1`:
//!
//! ```text
//!         b[0] + b[1] z^-1 + ... + b[N] z^-N
//! H(z) = ------------------------------------
//!         a[0] + a[1] z^-1 + ... + a[N] z^-N
//! ```
//!
//! Materials are fitted as pressure reflectances and converted to the
//! admittance domain before they reach the waveguide.

pub mod biquad;
pub mod fitter;
pub mod memory;
pub mod stability;

use std::f64::consts::PI;

use ndarray::Array1;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

pub use biquad::{convolve, peak_cascade, BiquadCascade, BiquadCoefficients, PeakDescriptor};
pub use fitter::{fit_filter, FrequencyEnvelope};
pub use memory::{cascade_step, filter_step, FilterMemory};
pub use stability::is_stable;

use crate::error::{Result, WaveguideError};

/// Canonical-form filter coefficients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCoefficients {
    /// Numerator, ascending powers of `z^-1`.
    pub b: Vec<f64>,
    /// Denominator, ascending powers of `z^-1`.
    pub a: Vec<f64>,
}

impl FilterCoefficients {
    /// Build from numerator and denominator of equal, non-zero length.
    pub fn new(b: Vec<f64>, a: Vec<f64>) -> Result<Self> {
        if b.is_empty() || b.len() != a.len() {
            return Err(WaveguideError::FilterOrder {
                order: a.len().saturating_sub(1),
                message: format!(
                    "numerator has {} coefficients, denominator has {}",
                    b.len(),
                    a.len()
                ),
            });
        }
        Ok(Self { b, a })
    }

    /// Identity filter of the given order.
    pub fn flat(order: usize) -> Self {
        Self::gain(1.0, order)
    }

    /// Frequency-independent gain of the given order.
    pub fn gain(gain: f64, order: usize) -> Self {
        let mut b = vec![0.0; order + 1];
        let mut a = vec![0.0; order + 1];
        b[0] = gain;
        a[0] = 1.0;
        Self { b, a }
    }

    pub fn order(&self) -> usize {
        self.a.len().saturating_sub(1)
    }

    /// Response at normalised angular frequency `omega` (radians/sample).
    pub fn response(&self, omega: f64) -> Complex64 {
        let num = polyval(&self.b, omega);
        let den = polyval(&self.a, omega);
        num / den
    }

    /// Responses over a grid of angular frequencies.
    pub fn freqz(&self, omegas: &Array1<f64>) -> Array1<Complex64> {
        omegas.mapv(|w| self.response(w))
    }

    /// Whether every pole lies strictly inside the unit circle.
    pub fn is_stable(&self) -> bool {
        is_stable(&self.a)
    }

    pub fn is_finite(&self) -> bool {
        self.b.iter().chain(self.a.iter()).all(|c| c.is_finite())
    }

    /// Fail with [`WaveguideError::NumericalAnomaly`] on the first NaN or infinity.
    pub fn check_finite(&self) -> Result<()> {
        match self
            .b
            .iter()
            .chain(self.a.iter())
            .position(|c| !c.is_finite())
        {
            Some(index) => Err(WaveguideError::NumericalAnomaly {
                quantity: "coefficient".to_string(),
                step: 0,
                index,
            }),
            None => Ok(()),
        }
    }

    /// Scale so that `a[0] == 1`. Left unchanged when `a[0]` is zero.
    pub fn normalised(&self) -> Self {
        let a0 = self.a.first().copied().unwrap_or(0.0);
        if a0 == 0.0 {
            return self.clone();
        }
        Self {
            b: self.b.iter().map(|c| c / a0).collect(),
            a: self.a.iter().map(|c| c / a0).collect(),
        }
    }

    /// Reflectance to impedance: `Z = (1 + R) / (1 - R)`.
    pub fn to_impedance(&self) -> Self {
        let b = self.a.iter().zip(&self.b).map(|(a, b)| a + b).collect();
        let a = self.a.iter().zip(&self.b).map(|(a, b)| a - b).collect();
        Self { b, a }.normalised()
    }

    /// Reflectance to admittance: `Y = (1 - R) / (1 + R)`.
    ///
    /// A rigid wall (`R = 1`) maps to `Y = 0`.
    pub fn to_admittance(&self) -> Self {
        let b = self.a.iter().zip(&self.b).map(|(a, b)| a - b).collect();
        let a = self.a.iter().zip(&self.b).map(|(a, b)| a + b).collect();
        Self { b, a }.normalised()
    }
}

fn polyval(coeffs: &[f64], omega: f64) -> Complex64 {
    coeffs
        .iter()
        .enumerate()
        .map(|(k, &c)| c * Complex64::from_polar(1.0, -omega * k as f64))
        .sum()
}

/// Pressure reflectance magnitude of a surface with absorption `alpha`.
pub fn absorption_to_pressure_reflectance(alpha: f64) -> f64 {
    (1.0 - alpha.clamp(0.0, 1.0)).sqrt()
}

/// Frequency-independent reflectance filter for a single absorption value.
pub fn flat_reflectance(alpha: f64, order: usize) -> FilterCoefficients {
    FilterCoefficients::gain(absorption_to_pressure_reflectance(alpha), order)
}

/// Dense grid of `n` angular frequencies covering `[0, PI]`.
pub fn omega_grid(n: usize) -> Array1<f64> {
    Array1::linspace(0.0, PI, n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_response_is_unity() {
        let flat = FilterCoefficients::flat(4);
        for w in omega_grid(16).iter() {
            assert!((flat.response(*w) - Complex64::new(1.0, 0.0)).norm() < 1e-12);
        }
    }

    #[test]
    fn test_rigid_wall_admittance_is_zero() {
        let rigid = flat_reflectance(0.0, 2);
        let y = rigid.to_admittance();
        assert!(y.b.iter().all(|&c| c == 0.0));
        assert_eq!(y.a[0], 1.0);
    }

    #[test]
    fn test_admittance_of_flat_reflectance() {
        let r = absorption_to_pressure_reflectance(0.75);
        assert!((r - 0.5).abs() < 1e-12);
        let y = flat_reflectance(0.75, 1).to_admittance();
        assert!((y.b[0] - 1.0 / 3.0).abs() < 1e-12);
        let z = flat_reflectance(0.75, 1).to_impedance();
        assert!((z.b[0] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_new_rejects_mismatched_lengths() {
        assert!(FilterCoefficients::new(vec![1.0], vec![1.0, 0.5]).is_err());
        assert!(FilterCoefficients::new(vec![], vec![]).is_err());
    }

    #[test]
    fn test_check_finite_reports_index() {
        let bad = FilterCoefficients {
            b: vec![1.0, 0.0],
            a: vec![1.0, f64::NAN],
        };
        match bad.check_finite() {
            Err(WaveguideError::NumericalAnomaly { index, .. }) => assert_eq!(index, 3),
            other => panic!("unexpected {:?}", other),
        }
    }
}
