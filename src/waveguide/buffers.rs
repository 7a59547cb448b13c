//! Double-buffered pressure storage.

/// Which named buffer currently holds time step `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    A,
    B,
}

/// Two pressure buffers with a current/previous selector.
///
/// The update reads `current` (time `n`) and overwrites `previous`
/// (time `n - 1`) with time `n + 1`; [`PressureBuffers::swap`] then makes it
/// current.
#[derive(Debug, Clone)]
pub struct PressureBuffers {
    a: Vec<f64>,
    b: Vec<f64>,
    current: Slot,
}

impl PressureBuffers {
    pub fn new(len: usize) -> Self {
        Self {
            a: vec![0.0; len],
            b: vec![0.0; len],
            current: Slot::A,
        }
    }

    pub fn len(&self) -> usize {
        self.a.len()
    }

    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
    }

    /// Zero both buffers.
    pub fn reset(&mut self) {
        self.a.iter_mut().for_each(|v| *v = 0.0);
        self.b.iter_mut().for_each(|v| *v = 0.0);
        self.current = Slot::A;
    }

    pub fn current(&self) -> &[f64] {
        match self.current {
            Slot::A => &self.a,
            Slot::B => &self.b,
        }
    }

    pub fn current_mut(&mut self) -> &mut [f64] {
        match self.current {
            Slot::A => &mut self.a,
            Slot::B => &mut self.b,
        }
    }

    pub fn previous(&self) -> &[f64] {
        match self.current {
            Slot::A => &self.b,
            Slot::B => &self.a,
        }
    }

    /// `(current, previous)` for the update.
    pub fn split_mut(&mut self) -> (&[f64], &mut [f64]) {
        match self.current {
            Slot::A => (&self.a, &mut self.b),
            Slot::B => (&self.b, &mut self.a),
        }
    }

    pub fn swap(&mut self) {
        self.current = match self.current {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        };
    }
}
