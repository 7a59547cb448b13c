//! Receiver sampling: pressure, particle velocity and intensity.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use super::source::Placement;
use crate::error::{Result, WaveguideError};
use crate::geometry::Vec3;
use crate::mesh::{Mesh, NO_NEIGHBOR};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Receiver {
    pub placement: Placement,
}

impl Receiver {
    pub fn new(position: Vec3) -> Self {
        Self {
            placement: Placement::Position(position),
        }
    }

    pub fn at_node(index: usize) -> Self {
        Self {
            placement: Placement::Node(index),
        }
    }
}

/// What the receiver saw at one step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepOutput {
    pub pressure: f64,
    /// Integrated particle velocity (m/s).
    pub velocity: Vec3,
    /// Instantaneous intensity, `velocity * pressure`.
    pub intensity: Vec3,
}

impl StepOutput {
    pub fn is_finite(&self) -> bool {
        self.pressure.is_finite()
            && self.velocity.iter().all(|v| v.is_finite())
            && self.intensity.iter().all(|v| v.is_finite())
    }
}

/// Receiver bound to a node, with the port-to-gradient transform.
#[derive(Debug, Clone)]
pub(crate) struct ReceiverState {
    pub index: usize,
    /// Neighbor per port, `None` where the neighbor is not an inside node.
    ports: Vec<Option<usize>>,
    /// 3 x P pseudo-inverse of the port direction matrix.
    transform: DMatrix<f64>,
    velocity: Vec3,
    time_step: f64,
    ambient_density: f64,
    spacing: f64,
}

impl ReceiverState {
    pub fn new(mesh: &Mesh, index: usize, time_step: f64, ambient_density: f64) -> Result<Self> {
        let num_ports = mesh.topology().num_ports();
        let node = &mesh.nodes()[index];
        let ports: Vec<Option<usize>> = node
            .ports
            .iter()
            .take(num_ports)
            .map(|&p| {
                (p != NO_NEIGHBOR && mesh.nodes()[p as usize].is_inside()).then_some(p as usize)
            })
            .collect();

        let directions = mesh.port_directions(index);
        let unit = DMatrix::from_fn(num_ports, 3, |row, col| {
            if ports[row].is_some() {
                directions[row][col]
            } else {
                0.0
            }
        });
        let transform = unit
            .pseudo_inverse(1e-12)
            .map_err(|message| WaveguideError::config(message.to_string()))?;

        Ok(Self {
            index,
            ports,
            transform,
            velocity: Vec3::zeros(),
            time_step,
            ambient_density,
            spacing: mesh.spacing(),
        })
    }

    #[cfg(test)]
    pub fn transform(&self) -> &DMatrix<f64> {
        &self.transform
    }

    pub fn reset(&mut self) {
        self.velocity = Vec3::zeros();
    }

    /// Sample pressure at time `n` and advance the velocity integrator.
    ///
    /// The integrator is `T z^-1 / (1 - z^-1)`: the reported velocity
    /// covers gradients up to `n - 1`.
    pub fn sample(&mut self, pressure: &[f64]) -> StepOutput {
        let p = pressure[self.index];
        let gradient = nalgebra::DVector::from_iterator(
            self.ports.len(),
            self.ports.iter().map(|port| match port {
                Some(n) => (pressure[*n] - p) / self.spacing,
                None => 0.0,
            }),
        );
        let grad3 = &self.transform * gradient;

        let velocity = self.velocity;
        let scale = -self.time_step / self.ambient_density;
        self.velocity += Vec3::new(grad3[0], grad3[1], grad3[2]) * scale;

        StepOutput {
            pressure: p,
            velocity,
            intensity: velocity * p,
        }
    }
}
