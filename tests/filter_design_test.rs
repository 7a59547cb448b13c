//! Boundary filter design: stability, fitting and form conversions.

mod common;

use std::f64::consts::PI;

use roomsim_waveguide::filters::{
    fit_filter, is_stable, omega_grid, peak_cascade, BiquadCascade, BiquadCoefficients,
    FrequencyEnvelope, PeakDescriptor,
};
use roomsim_waveguide::{FitterConfig, Material, WaveguideError};

use common::init_logging;

#[test]
fn test_stability_reference_denominators() {
    assert!(is_stable(&[1.0]));
    assert!(is_stable(&[1.0, 0.5]));
    assert!(!is_stable(&[1.0, 1.5]));
    for last in [1.0, -1.0, 1.0001, 7.0] {
        assert!(!is_stable(&[1.0, 0.1, -0.2, last]));
    }
}

#[test]
fn test_flat_target_round_trip() {
    init_logging();
    let config = FitterConfig::default();
    for order in [1, 2, 3, 6] {
        let filter = fit_filter(&FrequencyEnvelope::flat(1.0), order, &config)
            .expect("flat target must fit");
        assert_eq!(filter.order(), order);
        assert!(filter.is_stable());
        for w in omega_grid(config.grid_points).iter() {
            let gain = filter.response(*w).norm();
            assert!((gain - 1.0).abs() < 1e-6, "order {} gain {} at {}", order, gain, w);
        }
    }
}

#[test]
fn test_material_fit_follows_the_envelope() {
    init_logging();
    let config = FitterConfig::default();
    let sample_rate = 8000.0;
    for material in [Material::carpet(), Material::drywall(), Material::acoustic_foam()] {
        let envelope = material
            .reflectance_envelope(sample_rate)
            .expect("bands below Nyquist");
        for order in [4, 6] {
            let filter = material
                .reflectance_filter(sample_rate, order, &config)
                .unwrap_or_else(|e| panic!("{} order {}: {}", material.name, order, e));
            assert!(filter.is_stable());
            assert!(filter.is_finite());

            let worst = omega_grid(config.grid_points)
                .iter()
                .map(|&w| (filter.response(w).norm() - envelope.amplitude_at(w / PI)).abs())
                .fold(0.0_f64, f64::max);
            assert!(
                worst < 0.2,
                "{} order {}: worst magnitude error {}",
                material.name,
                order,
                worst
            );
        }
    }
}

#[test]
fn test_unstable_fit_names_the_material() {
    let config = FitterConfig {
        max_attempts: 0,
        ..Default::default()
    };
    match Material::drywall().reflectance_filter(8000.0, 4, &config) {
        Err(WaveguideError::UnstableFilter { material, .. }) => assert_eq!(material, "Drywall"),
        other => panic!("expected an unstable filter error, got {:?}", other),
    }
}

#[test]
fn test_exhausted_retries_are_reported_not_defaulted() {
    let config = FitterConfig {
        max_attempts: 0,
        ..Default::default()
    };
    let err = Material::carpet()
        .reflectance_filter(8000.0, 2, &config)
        .expect_err("no attempts allowed");
    assert!(err.is_filter_error());
    assert!(err.to_string().contains("unable to generate stable boundary filter"));
    assert!(err.to_string().contains("Carpet"));
}

#[test]
fn test_peak_cascade_factorises_back() {
    let canonical = peak_cascade(&[
        PeakDescriptor {
            gain_db: -3.0,
            centre: 0.05,
            q: 0.7,
        },
        PeakDescriptor {
            gain_db: -9.0,
            centre: 0.3,
            q: 1.2,
        },
    ]);
    assert!(canonical.is_stable());
    let cascade = BiquadCascade::from_canonical(&canonical).expect("factorisation");
    for w in omega_grid(64).iter() {
        let lhs = cascade.to_canonical().response(*w);
        let rhs = canonical.response(*w);
        assert!((lhs - rhs).norm() < 1e-8);
    }
}

#[test]
fn test_zero_db_peak_is_identity() {
    let peak = BiquadCoefficients::peak(0.0, 0.42, 0.9);
    assert_eq!(peak.b, peak.a);
    for w in omega_grid(16).iter() {
        assert!((peak.to_canonical().response(*w).norm() - 1.0).abs() < 1e-12);
    }
}

#[test]
fn test_admittance_of_fitted_rigid_wall() {
    let config = FitterConfig::default();
    let y = Material::rigid()
        .admittance_filter(10_000.0, 3, &config)
        .expect("rigid wall fits");
    assert!(y.is_stable());
    for w in omega_grid(32).iter() {
        assert!(y.response(*w).norm() < 1e-6);
    }
}
