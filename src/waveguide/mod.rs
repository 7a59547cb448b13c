//! Waveguide mesh engine.
//!
//! One [`Waveguide`] owns a classified mesh, the boundary filters and all run
//! state. A step is:
//!
//! 1. source injection into the time-`n` buffer;
//! 2. receiver sampling at time `n`;
//! 3. the mesh recursion
//!    `p[n+1] = (sum of inside-neighbor p[n]) / divisor - p[n-1]`,
//!    written over `p[n-1]`;
//! 4. boundary nodes pass their raw value through their filter;
//! 5. buffer swap.
//!
//! Every node reads only the time-`n` buffer, so the recursion is safe to
//! spread across threads.

mod buffers;
mod progress;
mod receiver;
mod run;
mod source;

use log::debug;
use rayon::prelude::*;

pub use buffers::PressureBuffers;
pub use progress::ProgressReporter;
pub use receiver::{Receiver, StepOutput};
pub use run::{CallbackAction, StepProgress};
pub use source::{free_field_response, make_transparent, Placement, Source, SourceSignal};

use receiver::ReceiverState;
use source::Injection;

use crate::config::{time_step, Dispatch, FilterForm, WaveguideConfig};
use crate::error::{Result, WaveguideError};
use crate::filters::{
    cascade_step, filter_step, BiquadCascade, FilterCoefficients, FilterMemory,
};
use crate::mesh::{Mesh, Node, NodeClass, NO_NEIGHBOR};

/// Boundary filters in the storage form selected by the configuration.
#[derive(Debug, Clone)]
enum BoundaryFilters {
    Canonical(Vec<FilterCoefficients>),
    Cascade(Vec<BiquadCascade>),
}

impl BoundaryFilters {
    fn stride(&self) -> usize {
        let stride = match self {
            BoundaryFilters::Canonical(f) => f.iter().map(|f| f.order()).max().unwrap_or(0),
            BoundaryFilters::Cascade(c) => {
                c.iter().map(|c| 2 * c.sections.len()).max().unwrap_or(0)
            }
        };
        stride.max(1)
    }

    fn step(&self, material: usize, input: f64, memory: &mut [f64]) -> f64 {
        match self {
            BoundaryFilters::Canonical(f) => filter_step(input, memory, &f[material]),
            BoundaryFilters::Cascade(c) => cascade_step(input, memory, &c[material]),
        }
    }
}

/// Waveguide mesh simulation.
pub struct Waveguide {
    mesh: Mesh,
    config: WaveguideConfig,
    filters: BoundaryFilters,
    /// Node is simulated and feeds its neighbors.
    inside: Vec<bool>,
    buffers: PressureBuffers,
    memory: FilterMemory,
    scratch: Vec<f64>,
    time_step: f64,
    /// Longest free-field response computed so far, for transparent sources.
    free_field: Vec<f64>,
}

impl Waveguide {
    /// Bind a mesh to one filter per material index.
    ///
    /// `filters` are admittance-domain boundary filters; every boundary
    /// node's material index must address one of them.
    pub fn new(
        mesh: Mesh,
        filters: Vec<FilterCoefficients>,
        config: WaveguideConfig,
    ) -> Result<Self> {
        config.check()?;
        if mesh.topology() != config.topology {
            return Err(WaveguideError::config(format!(
                "mesh is {:?} but configuration asks for {:?}",
                mesh.topology(),
                config.topology
            )));
        }
        for filter in &filters {
            filter.check_finite()?;
            if filter.a.first().copied().unwrap_or(0.0) == 0.0 {
                return Err(WaveguideError::FilterOrder {
                    order: filter.order(),
                    message: "denominator has a zero leading coefficient".to_string(),
                });
            }
        }
        for &index in mesh.boundary_nodes() {
            let material = mesh.nodes()[index].material;
            if material >= filters.len() {
                return Err(WaveguideError::MaterialIndexOutOfRange {
                    node: index,
                    material,
                    available: filters.len(),
                });
            }
        }

        let filters = match config.filter_form {
            FilterForm::Canonical => BoundaryFilters::Canonical(filters),
            FilterForm::BiquadCascade => BoundaryFilters::Cascade(
                filters
                    .iter()
                    .map(BiquadCascade::from_canonical)
                    .collect::<Result<_>>()?,
            ),
        };

        let inside = mesh.nodes().iter().map(Node::is_inside).collect();
        let num_boundary = mesh.boundary_nodes().len();
        let memory = FilterMemory::new(num_boundary, filters.stride());
        let buffers = PressureBuffers::new(mesh.len());
        let time_step = time_step(config.speed_of_sound, mesh.spacing());
        debug!(
            "waveguide ready: {} nodes, {} boundary filters, T = {:.3e}s",
            mesh.len(),
            num_boundary,
            time_step
        );

        Ok(Self {
            mesh,
            config,
            filters,
            inside,
            buffers,
            memory,
            scratch: vec![0.0; num_boundary],
            time_step,
            free_field: Vec::new(),
        })
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn config(&self) -> &WaveguideConfig {
        &self.config
    }

    /// Seconds per step.
    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    pub fn sample_rate(&self) -> f64 {
        1.0 / self.time_step
    }

    /// Pressure field at the current time step.
    pub fn pressure(&self) -> &[f64] {
        self.buffers.current()
    }

    /// Zero all pressure and filter state.
    pub fn reset(&mut self) {
        self.buffers.reset();
        self.memory.reset();
    }

    fn resolve_inside(&self, placement: &Placement) -> Option<usize> {
        let index = placement.resolve(&self.mesh);
        (index < self.mesh.len() && self.inside[index]).then_some(index)
    }

    fn source_index(&self, source: &Source) -> Result<usize> {
        if self.mesh.num_inside() == 0 {
            return Err(WaveguideError::EmptyMesh);
        }
        self.resolve_inside(&source.placement)
            .ok_or_else(|| WaveguideError::SourceOutsideMesh {
                index: source.placement.resolve(&self.mesh),
            })
    }

    fn receiver_state(&self, receiver: &Receiver) -> Result<ReceiverState> {
        if self.mesh.num_inside() == 0 {
            return Err(WaveguideError::EmptyMesh);
        }
        let index = self.resolve_inside(&receiver.placement).ok_or_else(|| {
            WaveguideError::ReceiverOutsideMesh {
                index: receiver.placement.resolve(&self.mesh),
            }
        })?;
        ReceiverState::new(
            &self.mesh,
            index,
            self.time_step,
            self.config.ambient_density,
        )
    }

    /// Reset state and apply the source's initial conditions.
    fn prepare_source(&mut self, source: &Source, index: usize) -> Result<Injection> {
        self.reset();
        let injection = match &source.signal {
            SourceSignal::Hard(s) => Injection::Force(s.clone()),
            SourceSignal::Soft(s) => Injection::Add(s.clone()),
            SourceSignal::Transparent(s) => {
                let length = self.config.transparent_length.min(s.len());
                let response = self.free_field_prefix(length)?;
                Injection::Add(make_transparent(s, response))
            }
            SourceSignal::Gaussian { amplitude } => {
                self.set_gaussian_field(index, *amplitude)?;
                Injection::None
            }
        };
        Ok(injection)
    }

    /// First `length` samples of the free-field response, computed once and
    /// reused by later runs that need no more samples.
    fn free_field_prefix(&mut self, length: usize) -> Result<&[f64]> {
        if self.free_field.len() < length {
            self.free_field = free_field_response(
                self.mesh.topology(),
                self.mesh.spacing(),
                length,
                &self.config,
            )?;
        } else {
            debug!("reusing {} cached free-field samples", length);
        }
        Ok(&self.free_field[..length])
    }

    fn set_gaussian_field(&mut self, centre: usize, amplitude: f64) -> Result<()> {
        let centre = self.mesh.nodes()[centre].position;
        let sigma = self.config.gaussian_sigma * self.mesh.spacing();
        let denom = 2.0 * sigma * sigma;
        let nodes = self.mesh.nodes();
        let inside = &self.inside;
        self.buffers
            .current_mut()
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, p)| {
                *p = if inside[i] {
                    amplitude * (-(nodes[i].position - centre).norm_squared() / denom).exp()
                } else {
                    0.0
                };
            });
        if self.buffers.current().iter().all(|&p| p == 0.0) {
            return Err(WaveguideError::config(
                "gaussian source produced an all-zero pressure field",
            ));
        }
        Ok(())
    }

    /// Advance one step. `current` must already hold the injected time-`n`
    /// field.
    fn update(&mut self, step: usize) -> Result<()> {
        let divisor = self.mesh.topology().port_divisor();
        let nodes = self.mesh.nodes();
        let inside = &self.inside;
        let dispatch = self.config.dispatch;
        let (current, next) = self.buffers.split_mut();

        let recurse = |(i, p): (usize, &mut f64)| {
            let node = &nodes[i];
            if node.class == NodeClass::Outside {
                return;
            }
            let sum: f64 = node
                .ports
                .iter()
                .filter(|&&n| n != NO_NEIGHBOR && inside[n as usize])
                .map(|&n| current[n as usize])
                .sum();
            *p = sum / divisor - *p;
        };
        match dispatch {
            Dispatch::Serial => next.iter_mut().enumerate().for_each(recurse),
            Dispatch::Parallel => next.par_iter_mut().enumerate().for_each(recurse),
        }

        let boundary_nodes = self.mesh.boundary_nodes();
        let filters = &self.filters;
        let stride = self.memory.stride();
        let next_ro: &[f64] = next;
        let filter = |((slot, out), memory): ((usize, &mut f64), &mut [f64])| {
            let node = boundary_nodes[slot];
            *out = filters.step(nodes[node].material, next_ro[node], memory);
        };
        match dispatch {
            Dispatch::Serial => self
                .scratch
                .iter_mut()
                .enumerate()
                .zip(self.memory.as_mut_slice().chunks_mut(stride))
                .for_each(filter),
            Dispatch::Parallel => self
                .scratch
                .par_iter_mut()
                .enumerate()
                .zip(self.memory.as_mut_slice().par_chunks_mut(stride))
                .for_each(filter),
        }
        for (&node, &value) in boundary_nodes.iter().zip(&self.scratch) {
            next[node] = value;
        }

        if self.config.check_numerics {
            if let Some(index) = next.iter().position(|p| !p.is_finite()) {
                return Err(WaveguideError::NumericalAnomaly {
                    quantity: "pressure".to_string(),
                    step,
                    index,
                });
            }
        }

        self.buffers.swap();
        Ok(())
    }
}
