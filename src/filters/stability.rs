//! Pole stability via reflection-coefficient reduction.

/// Whether all roots of the denominator `a` lie strictly inside the unit
/// circle.
///
/// `a` is in ascending powers of `z^-1` and is expected to be monic
/// (`a[0] == 1`). The last coefficient is the reflection coefficient of the
/// current order; it is eliminated and the shorter polynomial is checked in
/// turn. No tolerance is applied.
pub fn is_stable(a: &[f64]) -> bool {
    let mut current = a.to_vec();
    while current.len() > 1 {
        let last = current.len() - 1;
        let rci = current[last];
        if !(rci.abs() < 1.0) {
            return false;
        }
        let denom = 1.0 - rci * rci;
        current = (0..last)
            .map(|i| (current[i] - rci * current[last - i]) / denom)
            .collect();
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_cases() {
        assert!(is_stable(&[1.0]));
        assert!(is_stable(&[1.0, 0.5]));
        assert!(!is_stable(&[1.0, 1.5]));
        assert!(is_stable(&[]));
    }

    #[test]
    fn test_last_coefficient_at_unit_magnitude_is_unstable() {
        assert!(!is_stable(&[1.0, 0.2, -1.0]));
        assert!(!is_stable(&[1.0, 0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_second_order_poles() {
        // (1 - 0.9z^-1)(1 - 0.8z^-1)
        assert!(is_stable(&[1.0, -1.7, 0.72]));
        // (1 - 1.1z^-1)(1 - 0.5z^-1)
        assert!(!is_stable(&[1.0, -1.6, 0.55]));
        // complex pair with radius 0.95
        let r: f64 = 0.95;
        let theta: f64 = 0.3;
        assert!(is_stable(&[1.0, -2.0 * r * theta.cos(), r * r]));
    }

    #[test]
    fn test_nan_is_unstable() {
        assert!(!is_stable(&[1.0, f64::NAN]));
    }
}
