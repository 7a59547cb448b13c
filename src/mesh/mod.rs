//! Lattice mesh construction.
//!
//! A [`Mesh`] is the node table the waveguide runs on: positions, neighbor
//! ports, classification and, for boundary nodes, the material and filter
//! state slot. Both topologies share this type; only the [`Lattice`] differs.

mod classify;
pub mod lattice;

use std::time::Instant;

use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

pub use lattice::{
    cube_side_from_node_spacing, Lattice, Locator, Ports, RectangularLattice, TetrahedralLattice,
    MAX_PORTS, NO_NEIGHBOR,
};

use crate::config::Topology;
use crate::error::{Result, WaveguideError};
use crate::geometry::{compute_adjusted_boundary, Aabb, Boundary, Vec3};

/// Sentinel `boundary_index` of nodes without filter state.
pub const NO_BOUNDARY: u32 = u32::MAX;

/// Classification of a mesh node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeClass {
    /// Not simulated.
    Outside,
    /// Free-field node.
    Inside,
    /// Wall node; bit `p` is set when port `p` leads to the interior.
    Boundary(u8),
    /// Concave corner node facing the interior through several ports.
    Reentrant,
}

impl NodeClass {
    /// Whether the node carries a boundary filter.
    pub fn is_boundary(self) -> bool {
        matches!(self, NodeClass::Boundary(_) | NodeClass::Reentrant)
    }
}

/// One lattice node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub position: Vec3,
    pub ports: Ports,
    pub class: NodeClass,
    /// Material index for boundary nodes, 0 otherwise.
    pub material: usize,
    /// Dense index into boundary filter state, [`NO_BOUNDARY`] otherwise.
    pub boundary_index: u32,
}

impl Node {
    pub fn is_inside(&self) -> bool {
        self.class == NodeClass::Inside
    }

    pub fn is_outside(&self) -> bool {
        self.class == NodeClass::Outside
    }
}

/// Read-only summary of a mesh, for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshDescriptor {
    pub topology: Topology,
    pub spacing: f64,
    pub min: [f64; 3],
    pub max: [f64; 3],
    /// Points (rectangular) or unit cubes (tetrahedral) per axis.
    pub dimensions: [i64; 3],
    pub num_nodes: usize,
    pub inside: usize,
    pub boundary: usize,
    pub reentrant: usize,
    pub outside: usize,
}

/// Classified lattice mesh.
#[derive(Debug, Clone)]
pub struct Mesh {
    lattice: Lattice,
    spacing: f64,
    aabb: Aabb,
    nodes: Vec<Node>,
    boundary_nodes: Vec<usize>,
}

impl Mesh {
    /// Build and classify a mesh covering `boundary`.
    ///
    /// `spacing` is the distance between neighboring nodes; `anchor` is
    /// guaranteed to coincide with a node (for the tetrahedral lattice, the
    /// corner node of a unit cube).
    pub fn build<B: Boundary + ?Sized>(
        boundary: &B,
        topology: Topology,
        spacing: f64,
        anchor: &Vec3,
    ) -> Result<Self> {
        let start = Instant::now();
        let lattice_step = match topology {
            Topology::Rectangular => spacing,
            Topology::Tetrahedral => cube_side_from_node_spacing(spacing),
        };
        let aabb = compute_adjusted_boundary(&boundary.aabb(), anchor, lattice_step)?;
        let lattice = match topology {
            Topology::Rectangular => Lattice::Rectangular(RectangularLattice::new(&aabb, spacing)),
            Topology::Tetrahedral => {
                Lattice::Tetrahedral(TetrahedralLattice::new(&aabb, lattice_step))
            }
        };

        let num_nodes = lattice.num_nodes().ok_or_else(|| {
            WaveguideError::config(format!(
                "spacing {} gives a node count that does not fit in memory",
                spacing
            ))
        })?;
        if num_nodes >= NO_NEIGHBOR as usize {
            return Err(WaveguideError::config(format!(
                "mesh would have {} nodes, more than a u32 port can address",
                num_nodes
            )));
        }
        let dim = lattice.dim();
        debug!(
            "building {:?} mesh: spacing {}, {}x{}x{} cells, {} nodes",
            topology, spacing, dim.x, dim.y, dim.z, num_nodes
        );

        let mut nodes: Vec<Node> = (0..num_nodes)
            .into_par_iter()
            .map(|index| Node {
                position: lattice.compute_position(&lattice.compute_locator(index)),
                ports: lattice.neighbors(index),
                class: NodeClass::Outside,
                material: 0,
                boundary_index: NO_BOUNDARY,
            })
            .collect();

        classify::classify(&mut nodes, boundary);

        let mut boundary_nodes = Vec::new();
        for (index, node) in nodes.iter_mut().enumerate() {
            if node.class.is_boundary() {
                node.material = boundary.material_index(&node.position);
                node.boundary_index = boundary_nodes.len() as u32;
                boundary_nodes.push(index);
            }
        }

        let mesh = Self {
            lattice,
            spacing,
            aabb,
            nodes,
            boundary_nodes,
        };
        let d = mesh.descriptor();
        info!(
            "mesh built in {:.2?}: {} nodes ({} inside, {} boundary, {} reentrant)",
            start.elapsed(),
            d.num_nodes,
            d.inside,
            d.boundary,
            d.reentrant
        );
        Ok(mesh)
    }

    pub fn topology(&self) -> Topology {
        self.lattice.topology()
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    /// Distance between neighboring nodes.
    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    /// Anchor-aligned bounds covered by the lattice.
    pub fn aabb(&self) -> &Aabb {
        &self.aabb
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node indices carrying boundary filters, in `boundary_index` order.
    pub fn boundary_nodes(&self) -> &[usize] {
        &self.boundary_nodes
    }

    pub fn num_inside(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_inside()).count()
    }

    pub fn compute_index(&self, loc: &Locator) -> Option<usize> {
        self.lattice
            .contains(loc)
            .then(|| self.lattice.compute_index(loc))
    }

    pub fn compute_locator(&self, index: usize) -> Option<Locator> {
        (index < self.nodes.len()).then(|| self.lattice.compute_locator(index))
    }

    pub fn compute_position(&self, loc: &Locator) -> Vec3 {
        self.lattice.compute_position(loc)
    }

    /// Index of the node closest to `v`.
    pub fn nearest_index(&self, v: &Vec3) -> usize {
        self.lattice.compute_index(&self.lattice.nearest_locator(v))
    }

    /// Unit vectors along each port of `index`.
    pub fn port_directions(&self, index: usize) -> Vec<Vec3> {
        self.lattice.port_directions(index)
    }

    pub fn descriptor(&self) -> MeshDescriptor {
        let (inside, boundary, reentrant, outside) = classify::class_counts(&self.nodes);
        let dim = self.lattice.dim();
        MeshDescriptor {
            topology: self.topology(),
            spacing: self.spacing,
            min: [self.aabb.min.x, self.aabb.min.y, self.aabb.min.z],
            max: [self.aabb.max.x, self.aabb.max.y, self.aabb.max.z],
            dimensions: [dim.x, dim.y, dim.z],
            num_nodes: self.nodes.len(),
            inside,
            boundary,
            reentrant,
            outside,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{CuboidBoundary, LShapedBoundary};

    fn cube(size: f64) -> CuboidBoundary {
        CuboidBoundary::new(Vec3::zeros(), Vec3::repeat(size))
    }

    #[test]
    fn test_anchor_is_a_node() {
        let anchor = Vec3::new(2.0, 2.0, 2.0);
        let mesh = Mesh::build(&cube(4.0), Topology::Rectangular, 1.0, &anchor).unwrap();
        let index = mesh.nearest_index(&anchor);
        assert!((mesh.nodes()[index].position - anchor).norm() < 1e-9);
        assert!(mesh.nodes()[index].is_inside());
    }

    #[test]
    fn test_cuboid_class_counts() {
        let mesh = Mesh::build(&cube(4.0), Topology::Rectangular, 1.0, &Vec3::repeat(2.0)).unwrap();
        let d = mesh.descriptor();
        // 5^3 inside points, one layer of faces around them, plus edges
        assert_eq!(d.inside, 125);
        assert_eq!(d.boundary, 6 * 25 + 12 * 5);
        assert_eq!(d.reentrant, 0);
        assert_eq!(d.inside + d.boundary + d.reentrant + d.outside, d.num_nodes);
    }

    #[test]
    fn test_face_nodes_point_inwards() {
        let mesh = Mesh::build(&cube(4.0), Topology::Rectangular, 1.0, &Vec3::repeat(2.0)).unwrap();
        let index = mesh.nearest_index(&Vec3::new(-1.0, 2.0, 2.0));
        // +x port
        assert_eq!(mesh.nodes()[index].class, NodeClass::Boundary(0b10));
    }

    #[test]
    fn test_box_edges_promoted_corners_left_outside() {
        let mesh = Mesh::build(&cube(4.0), Topology::Rectangular, 1.0, &Vec3::repeat(2.0)).unwrap();
        let edge = mesh.nearest_index(&Vec3::new(-1.0, -1.0, 2.0));
        // +x and +y ports
        assert_eq!(mesh.nodes()[edge].class, NodeClass::Boundary(0b1010));
        let corner = mesh.nearest_index(&Vec3::new(-1.0, -1.0, -1.0));
        assert_eq!(mesh.nodes()[corner].class, NodeClass::Outside);
    }

    #[test]
    fn test_l_shape_has_reentrant_nodes() {
        let room = LShapedBoundary::new(6.0, 4.0, 3.0, 3.0, 2.0);
        let mesh =
            Mesh::build(&room, Topology::Rectangular, 0.5, &Vec3::new(1.0, 1.0, 1.0)).unwrap();
        let corner = mesh.nearest_index(&Vec3::new(3.5, 4.5, 1.0));
        assert_eq!(mesh.nodes()[corner].class, NodeClass::Reentrant);
        assert!(mesh.descriptor().reentrant > 0);
    }

    #[test]
    fn test_boundary_indices_are_dense() {
        let mesh = Mesh::build(&cube(3.0), Topology::Tetrahedral, 0.5, &Vec3::repeat(1.5)).unwrap();
        for (slot, &index) in mesh.boundary_nodes().iter().enumerate() {
            assert_eq!(mesh.nodes()[index].boundary_index as usize, slot);
        }
        let flagged = mesh
            .nodes()
            .iter()
            .filter(|n| n.boundary_index != NO_BOUNDARY)
            .count();
        assert_eq!(flagged, mesh.boundary_nodes().len());
    }

    #[test]
    fn test_tiny_spacing_is_a_config_error() {
        for topology in [Topology::Rectangular, Topology::Tetrahedral] {
            for spacing in [1e-7, 1e-4, 1e-300] {
                let err = Mesh::build(&cube(10.0), topology, spacing, &Vec3::repeat(5.0))
                    .expect_err("mesh is far too large");
                assert!(err.is_configuration_error(), "{:?} {}: {}", topology, spacing, err);
            }
        }
    }

    #[test]
    fn test_descriptor_serialises() {
        let mesh = Mesh::build(&cube(2.0), Topology::Rectangular, 1.0, &Vec3::repeat(1.0)).unwrap();
        let json = serde_json::to_string(&mesh.descriptor()).unwrap();
        let back: MeshDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mesh.descriptor());
    }
}
