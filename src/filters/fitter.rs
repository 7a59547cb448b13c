//! Equation-error IIR design against a magnitude envelope.
//!
//! The target magnitude is given by a sparse [`FrequencyEnvelope`] and is
//! cosine-interpolated onto a dense grid. A linear-phase delay turns it into
//! a complex target `D`; the fitter then solves
//!
//! ```text
//! min || W (A(w) D(w) - B(w)) ||
//! ```
//!
//! for `a[1..]` and `b` with `a[0] = 1`, reweighting by `1 / |A|` after each
//! solve. Unstable results are retried with a longer delay.

use std::f64::consts::PI;

use log::debug;
use nalgebra::{DMatrix, DVector};
use ndarray::Array1;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::{omega_grid, FilterCoefficients};
use crate::config::FitterConfig;
use crate::error::{Result, WaveguideError};

/// Ascending list of `(frequency, amplitude)` points, frequency normalised
/// to Nyquist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyEnvelope {
    points: Vec<(f64, f64)>,
}

impl FrequencyEnvelope {
    pub fn new(points: Vec<(f64, f64)>) -> Result<Self> {
        if points.is_empty() {
            return Err(WaveguideError::config("frequency envelope has no points"));
        }
        for (f, amp) in &points {
            if !(0.0..=1.0).contains(f) || !amp.is_finite() {
                return Err(WaveguideError::config(format!(
                    "envelope point ({}, {}) is out of range",
                    f, amp
                )));
            }
        }
        if points.windows(2).any(|w| w[1].0 <= w[0].0) {
            return Err(WaveguideError::config(
                "envelope frequencies must be strictly ascending",
            ));
        }
        Ok(Self { points })
    }

    /// The same amplitude at every frequency.
    pub fn flat(amplitude: f64) -> Self {
        Self {
            points: vec![(0.0, amplitude), (1.0, amplitude)],
        }
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Amplitude at `f`, cosine-interpolated between points and held
    /// constant past either end.
    pub fn amplitude_at(&self, f: f64) -> f64 {
        let first = self.points[0];
        let last = self.points[self.points.len() - 1];
        if f <= first.0 {
            return first.1;
        }
        if f >= last.0 {
            return last.1;
        }
        let upper = self.points.partition_point(|p| p.0 <= f);
        let (f0, y0) = self.points[upper - 1];
        let (f1, y1) = self.points[upper];
        let t = (f - f0) / (f1 - f0);
        let mu = (1.0 - (PI * t).cos()) * 0.5;
        y0 * (1.0 - mu) + y1 * mu
    }

    pub fn interpolate(&self, frequencies: &Array1<f64>) -> Array1<f64> {
        frequencies.mapv(|f| self.amplitude_at(f))
    }
}

/// One weighted least-squares solve. Returns `(a, b)`.
fn solve_weighted(
    basis: &DMatrix<Complex64>,
    target: &DVector<Complex64>,
    weights: &[f64],
    order: usize,
    rcond: f64,
) -> Result<(Vec<f64>, Vec<f64>)> {
    let rows = basis.nrows();
    let cols = basis.ncols();
    let mut lhs = DMatrix::<f64>::zeros(2 * rows, cols);
    let mut rhs = DVector::<f64>::zeros(2 * rows);
    for r in 0..rows {
        let w = weights[r];
        for c in 0..cols {
            let v = basis[(r, c)] * w;
            lhs[(r, c)] = v.re;
            lhs[(rows + r, c)] = v.im;
        }
        let d = target[r] * w;
        rhs[r] = d.re;
        rhs[rows + r] = d.im;
    }

    let svd = lhs.svd(true, true);
    let max_sv = svd.singular_values.max();
    let x = svd
        .solve(&rhs, rcond * max_sv)
        .map_err(|message| WaveguideError::FilterOrder {
            order,
            message: message.to_string(),
        })?;

    let mut a = Vec::with_capacity(order + 1);
    a.push(1.0);
    a.extend(x.iter().take(order));
    let b = x.iter().skip(order).copied().collect();
    Ok((a, b))
}

/// Fit a stable order-`order` filter to `envelope`.
///
/// Fails with [`WaveguideError::UnstableFilter`] once
/// `config.max_attempts` delays have been tried without a stable result.
pub fn fit_filter(
    envelope: &FrequencyEnvelope,
    order: usize,
    config: &FitterConfig,
) -> Result<FilterCoefficients> {
    if order == 0 {
        return Err(WaveguideError::FilterOrder {
            order,
            message: "order must be at least 1".to_string(),
        });
    }
    if config.grid_points < 2 * order + 1 {
        return Err(WaveguideError::FilterOrder {
            order,
            message: format!("{} grid points cannot determine it", config.grid_points),
        });
    }

    let omegas = omega_grid(config.grid_points);
    let amplitude = envelope.interpolate(&(&omegas / PI));
    let unknowns = 2 * order + 1;

    for attempt in 0..config.max_attempts {
        let delay = config.initial_delay + attempt as f64 * config.delay_step;
        let target = DVector::from_iterator(
            omegas.len(),
            omegas
                .iter()
                .zip(amplitude.iter())
                .map(|(&w, &amp)| amp * Complex64::from_polar(1.0, -delay * w)),
        );
        // [-D e^{-iwk}, k = 1..N | e^{-iwk}, k = 0..N]
        let basis = DMatrix::from_fn(omegas.len(), unknowns, |r, c| {
            let w = omegas[r];
            if c < order {
                -target[r] * Complex64::from_polar(1.0, -w * (c + 1) as f64)
            } else {
                Complex64::from_polar(1.0, -w * (c - order) as f64)
            }
        });

        let mut weights = vec![1.0; omegas.len()];
        let mut filter = FilterCoefficients::flat(order);
        for _ in 0..=config.iterations {
            let (a, b) = solve_weighted(&basis, &target, &weights, order, config.rcond)?;
            filter = FilterCoefficients { b, a };
            let den = FilterCoefficients {
                b: filter.a.clone(),
                a: vec![1.0],
            };
            for (w, &omega) in weights.iter_mut().zip(omegas.iter()) {
                *w = 1.0 / den.response(omega).norm().max(1e-12);
            }
        }

        if filter.is_finite() && filter.is_stable() {
            debug!(
                "fitted order {} filter with delay {} after {} attempt(s)",
                order,
                delay,
                attempt + 1
            );
            return Ok(filter);
        }
        debug!("order {} fit unstable at delay {}, retrying", order, delay);
    }

    Err(WaveguideError::UnstableFilter {
        material: "envelope".to_string(),
        attempts: config.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_interpolation() {
        let env = FrequencyEnvelope::new(vec![(0.0, 1.0), (0.5, 0.0), (1.0, 1.0)]).unwrap();
        assert_eq!(env.amplitude_at(0.0), 1.0);
        assert!((env.amplitude_at(0.25) - 0.5).abs() < 1e-12);
        assert_eq!(env.amplitude_at(0.5), 0.0);
        assert!(env.amplitude_at(0.1) > 0.5);
    }

    #[test]
    fn test_envelope_held_past_ends() {
        let env = FrequencyEnvelope::new(vec![(0.2, 0.8), (0.6, 0.4)]).unwrap();
        assert_eq!(env.amplitude_at(0.0), 0.8);
        assert_eq!(env.amplitude_at(1.0), 0.4);
    }

    #[test]
    fn test_envelope_validation() {
        assert!(FrequencyEnvelope::new(vec![]).is_err());
        assert!(FrequencyEnvelope::new(vec![(0.5, 1.0), (0.2, 1.0)]).is_err());
        assert!(FrequencyEnvelope::new(vec![(1.5, 1.0)]).is_err());
    }

    #[test]
    fn test_flat_fit() {
        let config = FitterConfig::default();
        for order in 1..=4 {
            let filter = fit_filter(&FrequencyEnvelope::flat(1.0), order, &config).unwrap();
            assert!(filter.is_stable());
            for w in omega_grid(32).iter() {
                assert!((filter.response(*w).norm() - 1.0).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_zero_attempts_fails() {
        let config = FitterConfig {
            max_attempts: 0,
            ..Default::default()
        };
        let err = fit_filter(&FrequencyEnvelope::flat(1.0), 2, &config).unwrap_err();
        assert!(err.is_filter_error());
    }

    #[test]
    fn test_order_zero_rejected() {
        let err = fit_filter(&FrequencyEnvelope::flat(1.0), 0, &FitterConfig::default())
            .unwrap_err();
        assert!(err.is_configuration_error());
    }
}
