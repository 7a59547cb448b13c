//! Lattice construction and classification on whole rooms.

mod common;

use roomsim_waveguide::mesh::{Locator, NodeClass, NO_NEIGHBOR};
use roomsim_waveguide::{LShapedBoundary, Mesh, SphereBoundary, Topology, Vec3};

use common::{cube_mesh, init_logging};

fn check_bijection(mesh: &Mesh) {
    for index in 0..mesh.len() {
        let loc = mesh.compute_locator(index).expect("index in range");
        assert_eq!(mesh.compute_index(&loc), Some(index));
    }
    assert_eq!(mesh.compute_locator(mesh.len()), None);
}

fn check_ports_in_range(mesh: &Mesh) {
    for node in mesh.nodes() {
        for &port in &node.ports {
            assert!(port == NO_NEIGHBOR || (port as usize) < mesh.len());
        }
    }
}

#[test]
fn test_locator_index_bijection() {
    init_logging();
    check_bijection(&cube_mesh(3.0, 0.5, Topology::Rectangular));
    check_bijection(&cube_mesh(3.0, 0.5, Topology::Tetrahedral));
}

#[test]
fn test_locator_round_trip_from_locator_side() {
    let mesh = cube_mesh(2.0, 0.5, Topology::Tetrahedral);
    let dim = mesh.lattice().dim();
    for sub in 0..8 {
        let loc = Locator::new(dim.map(|d| d - 1), sub);
        let index = mesh.compute_index(&loc).expect("locator in range");
        assert_eq!(mesh.compute_locator(index), Some(loc));
    }
    assert_eq!(mesh.compute_index(&Locator::new(dim, 0)), None);
    assert_eq!(mesh.compute_index(&Locator::grid(-1, 0, 0)), None);
    assert_eq!(mesh.compute_index(&Locator::grid(0, 0, 0)), Some(0));
}

#[test]
fn test_ports_are_valid_and_symmetric() {
    let mesh = cube_mesh(3.0, 0.5, Topology::Rectangular);
    check_ports_in_range(&mesh);
    for (index, node) in mesh.nodes().iter().enumerate() {
        for axis in 0..3 {
            let minus = node.ports[2 * axis];
            let plus = node.ports[2 * axis + 1];
            if plus != NO_NEIGHBOR {
                assert_eq!(mesh.nodes()[plus as usize].ports[2 * axis], index as u32);
            }
            if minus != NO_NEIGHBOR {
                assert_eq!(mesh.nodes()[minus as usize].ports[2 * axis + 1], index as u32);
            }
        }
    }

    let tetra = cube_mesh(3.0, 0.5, Topology::Tetrahedral);
    check_ports_in_range(&tetra);
    for (index, node) in tetra.nodes().iter().enumerate() {
        for &port in node.ports.iter().take(4) {
            if port != NO_NEIGHBOR {
                assert!(tetra.nodes()[port as usize].ports[..4].contains(&(index as u32)));
            }
        }
        assert!(node.ports[4..].iter().all(|&p| p == NO_NEIGHBOR));
    }
}

fn check_classification(mesh: &Mesh) {
    let nodes = mesh.nodes();
    for node in nodes {
        let neighbors: Vec<&NodeClass> = node
            .ports
            .iter()
            .filter(|&&p| p != NO_NEIGHBOR)
            .map(|&p| &nodes[p as usize].class)
            .collect();
        match node.class {
            NodeClass::Outside => {
                assert!(!neighbors.iter().any(|c| **c == NodeClass::Inside));
            }
            NodeClass::Inside => {
                assert!(neighbors.iter().any(|c| **c == NodeClass::Inside));
            }
            _ => {}
        }
    }
}

#[test]
fn test_no_outside_node_touches_the_interior() {
    init_logging();
    check_classification(&cube_mesh(3.0, 0.25, Topology::Rectangular));
    check_classification(&cube_mesh(3.0, 0.25, Topology::Tetrahedral));

    let sphere = SphereBoundary::new(Vec3::zeros(), 1.3);
    for topology in [Topology::Rectangular, Topology::Tetrahedral] {
        let mesh = Mesh::build(&sphere, topology, 0.2, &Vec3::zeros()).expect("sphere mesh");
        check_classification(&mesh);
    }

    let room = LShapedBoundary::new(4.0, 3.0, 2.0, 2.0, 1.5);
    let mesh = Mesh::build(&room, Topology::Rectangular, 0.25, &Vec3::new(1.0, 1.0, 0.75))
        .expect("L-shaped mesh");
    check_classification(&mesh);
}

#[test]
fn test_boundary_mask_matches_inside_ports() {
    let mesh = cube_mesh(2.0, 0.5, Topology::Rectangular);
    let nodes = mesh.nodes();
    for node in nodes {
        let inside_mask = node
            .ports
            .iter()
            .enumerate()
            .filter(|(_, &p)| p != NO_NEIGHBOR && nodes[p as usize].class == NodeClass::Inside)
            .fold(0u8, |m, (port, _)| m | (1 << port));
        if let NodeClass::Boundary(mask) = node.class {
            if inside_mask != 0 {
                assert_eq!(mask, inside_mask);
            }
        }
    }
}

#[test]
fn test_nearest_index_on_tetrahedral_lattice() {
    let mesh = cube_mesh(3.0, 0.5, Topology::Tetrahedral);
    for node in mesh.nodes().iter().step_by(7) {
        let probe = node.position + Vec3::new(0.05, -0.04, 0.03);
        let found = mesh.nearest_index(&probe);
        assert!((mesh.nodes()[found].position - node.position).norm() < 1e-9);
    }
}

#[test]
fn test_empty_boundary_builds_an_empty_mesh() {
    let sphere = SphereBoundary::new(Vec3::zeros(), 0.0);
    let mesh = Mesh::build(&sphere, Topology::Rectangular, 1.0, &Vec3::zeros()).expect("mesh");
    let descriptor = mesh.descriptor();
    assert_eq!(descriptor.inside, 0);
    assert_eq!(descriptor.boundary, 0);
    assert_eq!(descriptor.outside, descriptor.num_nodes);
}
