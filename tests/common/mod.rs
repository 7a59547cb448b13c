//! Shared fixtures for integration tests.

#![allow(dead_code)]

use roomsim_waveguide::{CuboidBoundary, FilterCoefficients, Mesh, Topology, Vec3};

/// Route `log` output through the test harness.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Cube `[0, size]^3` meshed with `spacing`, anchored at its centre.
pub fn cube_mesh(size: f64, spacing: f64, topology: Topology) -> Mesh {
    let room = CuboidBoundary::new(Vec3::zeros(), Vec3::repeat(size));
    Mesh::build(&room, topology, spacing, &Vec3::repeat(size * 0.5))
        .expect("Failed to build cube mesh")
}

/// A single perfectly reflecting material.
pub fn rigid_filters(order: usize) -> Vec<FilterCoefficients> {
    vec![FilterCoefficients::flat(order).to_admittance()]
}
