//! Per-node recursive filter state.

use super::{BiquadCascade, FilterCoefficients};

/// Flat arena of filter state, `stride` values per boundary node.
#[derive(Debug, Clone)]
pub struct FilterMemory {
    stride: usize,
    values: Vec<f64>,
}

impl FilterMemory {
    pub fn new(nodes: usize, stride: usize) -> Self {
        Self {
            stride,
            values: vec![0.0; nodes * stride],
        }
    }

    /// Clear every node's state.
    pub fn reset(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0.0);
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn num_nodes(&self) -> usize {
        self.values.len().checked_div(self.stride).unwrap_or(0)
    }

    pub fn node(&self, slot: usize) -> &[f64] {
        &self.values[slot * self.stride..(slot + 1) * self.stride]
    }

    pub fn node_mut(&mut self, slot: usize) -> &mut [f64] {
        &mut self.values[slot * self.stride..(slot + 1) * self.stride]
    }

    /// Whole arena, for chunked (possibly parallel) iteration.
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.values
    }
}

/// One sample through a transposed direct-form II filter.
///
/// `memory` must hold at least `filter.order()` values.
pub fn filter_step(input: f64, memory: &mut [f64], filter: &FilterCoefficients) -> f64 {
    let b = &filter.b;
    let a = &filter.a;
    let order = filter.order();
    if order == 0 {
        return input * b[0] / a[0];
    }

    let output = (input * b[0] + memory[0]) / a[0];
    for i in 0..order - 1 {
        memory[i] = b[i + 1] * input - a[i + 1] * output + memory[i + 1];
    }
    memory[order - 1] = b[order] * input - a[order] * output;
    output
}

/// One sample through a cascade; `memory` holds two values per section.
pub fn cascade_step(input: f64, memory: &mut [f64], cascade: &BiquadCascade) -> f64 {
    cascade
        .sections
        .iter()
        .zip(memory.chunks_exact_mut(2))
        .fold(input, |x, (s, m)| {
            let y = (x * s.b[0] + m[0]) / s.a[0];
            m[0] = s.b[1] * x - s.a[1] * y + m[1];
            m[1] = s.b[2] * x - s.a[2] * y;
            y
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::BiquadCoefficients;

    fn impulse_response(filter: &FilterCoefficients, n: usize) -> Vec<f64> {
        let mut memory = vec![0.0; filter.order()];
        (0..n)
            .map(|i| filter_step(if i == 0 { 1.0 } else { 0.0 }, &mut memory, filter))
            .collect()
    }

    #[test]
    fn test_one_pole_impulse_response() {
        // y[n] = x[n] + 0.5 y[n-1]
        let filter = FilterCoefficients {
            b: vec![1.0, 0.0],
            a: vec![1.0, -0.5],
        };
        let h = impulse_response(&filter, 4);
        assert_eq!(h, vec![1.0, 0.5, 0.25, 0.125]);
    }

    #[test]
    fn test_fir_delay() {
        let filter = FilterCoefficients {
            b: vec![0.0, 0.0, 2.0],
            a: vec![1.0, 0.0, 0.0],
        };
        assert_eq!(impulse_response(&filter, 4), vec![0.0, 0.0, 2.0, 0.0]);
    }

    #[test]
    fn test_cascade_matches_canonical() {
        let cascade = BiquadCascade::new(vec![
            BiquadCoefficients::peak(5.0, 0.2, 1.0),
            BiquadCoefficients::peak(-3.0, 0.6, 3.0),
        ]);
        let canonical = cascade.to_canonical();
        let mut m1 = vec![0.0; canonical.order()];
        let mut m2 = vec![0.0; 4];
        for i in 0..64 {
            let x = ((i * 7) % 11) as f64 - 5.0;
            let y1 = filter_step(x, &mut m1, &canonical);
            let y2 = cascade_step(x, &mut m2, &cascade);
            assert!((y1 - y2).abs() < 1e-9, "sample {}: {} vs {}", i, y1, y2);
        }
    }

    #[test]
    fn test_arena_reset() {
        let mut memory = FilterMemory::new(3, 2);
        memory.node_mut(1)[0] = 4.0;
        assert_eq!(memory.node(1), &[4.0, 0.0]);
        memory.reset();
        assert!(memory.node(1).iter().all(|&v| v == 0.0));
        assert_eq!(memory.num_nodes(), 3);
    }
}
