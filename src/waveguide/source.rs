//! Source excitation policies.

use log::debug;
use serde::{Deserialize, Serialize};

use super::{CallbackAction, Receiver, Waveguide};
use crate::config::{Topology, WaveguideConfig};
use crate::error::{Result, WaveguideError};
use crate::filters::FilterCoefficients;
use crate::geometry::{CuboidBoundary, Vec3};
use crate::mesh::Mesh;

/// Where a source or receiver sits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Placement {
    /// Snapped to the nearest node.
    Position(Vec3),
    /// Flat node index.
    Node(usize),
}

impl Placement {
    pub(crate) fn resolve(&self, mesh: &Mesh) -> usize {
        match self {
            Placement::Position(p) => mesh.nearest_index(p),
            Placement::Node(index) => *index,
        }
    }
}

/// How the source drives the mesh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SourceSignal {
    /// Overwrite the node pressure while the sequence lasts.
    Hard(Vec<f64>),
    /// Add the sequence to the node pressure.
    Soft(Vec<f64>),
    /// Soft injection pre-compensated for the mesh's own response at the
    /// source node, approximating free-field excitation.
    Transparent(Vec<f64>),
    /// Gaussian initial pressure field centred on the source, no injection.
    Gaussian { amplitude: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub placement: Placement,
    pub signal: SourceSignal,
}

impl Source {
    pub fn new(position: Vec3, signal: SourceSignal) -> Self {
        Self {
            placement: Placement::Position(position),
            signal,
        }
    }

    pub fn at_node(index: usize, signal: SourceSignal) -> Self {
        Self {
            placement: Placement::Node(index),
            signal,
        }
    }
}

/// Per-step injection resolved from a [`SourceSignal`].
#[derive(Debug, Clone)]
pub(crate) enum Injection {
    Force(Vec<f64>),
    Add(Vec<f64>),
    None,
}

impl Injection {
    pub(crate) fn apply(&self, step: usize, pressure: &mut f64) {
        match self {
            Injection::Force(s) => {
                if let Some(v) = s.get(step) {
                    *pressure = *v;
                }
            }
            Injection::Add(s) => {
                if let Some(v) = s.get(step) {
                    *pressure += *v;
                }
            }
            Injection::None => {}
        }
    }
}

/// `x[n] = s[n] - sum_{k=1..n} h[k] s[n-k]`.
pub fn make_transparent(signal: &[f64], response: &[f64]) -> Vec<f64> {
    (0..signal.len())
        .map(|n| {
            let correction: f64 = (1..=n)
                .take_while(|&k| k < response.len())
                .map(|k| response[k] * signal[n - k])
                .sum();
            signal[n] - correction
        })
        .collect()
}

/// Cube centred on the origin whose walls are `length / 2 + 2` nodes away.
///
/// A wavefront moves at most one node per step, so an echo from these walls
/// needs more than `length` steps to get back to the centre.
pub(crate) fn free_field_room(spacing: f64, length: usize) -> CuboidBoundary {
    let half = (length as f64 / 2.0 + 2.0) * spacing;
    CuboidBoundary::new(Vec3::repeat(-half), Vec3::repeat(half))
}

/// Pressure at a soft unit-impulse source node of an unbounded lattice,
/// for the first `length` steps.
pub fn free_field_response(
    topology: Topology,
    spacing: f64,
    length: usize,
    config: &WaveguideConfig,
) -> Result<Vec<f64>> {
    if length == 0 {
        return Ok(Vec::new());
    }
    impulse_response_in(&free_field_room(spacing, length), topology, spacing, length, config)
}

/// Soft unit impulse at the origin of `room`, sampled at the same node.
fn impulse_response_in(
    room: &CuboidBoundary,
    topology: Topology,
    spacing: f64,
    length: usize,
    config: &WaveguideConfig,
) -> Result<Vec<f64>> {
    let mesh = Mesh::build(room, topology, spacing, &Vec3::zeros())?;
    let config = WaveguideConfig {
        topology,
        ..config.clone()
    };
    let mut waveguide = Waveguide::new(mesh, vec![FilterCoefficients::gain(0.0, 0)], config)?;

    let source = Source::new(Vec3::zeros(), SourceSignal::Soft(vec![1.0]));
    let receiver = Receiver::new(Vec3::zeros());
    let never = std::sync::atomic::AtomicBool::new(false);
    let outputs = waveguide
        .run(&source, &receiver, length, &never, |_| CallbackAction::Continue)?
        .ok_or_else(|| WaveguideError::config("free-field run was interrupted"))?;
    debug!("computed {} free-field samples", outputs.len());
    Ok(outputs.iter().map(|o| o.pressure).collect())
}
