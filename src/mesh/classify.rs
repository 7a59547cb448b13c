//! Node classification.
//!
//! Three fixed passes, run in order:
//! 1. predicate evaluation, keeping only inside nodes that have at least one
//!    inside neighbor;
//! 2. outside nodes next to inside nodes become boundary nodes, tagged with
//!    the ports that face the interior;
//! 3. boundary nodes facing the interior through several ports become
//!    reentrant, and outside nodes sitting diagonally behind two distinct
//!    walls become edge boundary nodes.
//!
//! This is not iterated to a fixpoint. Deeply concave rooms can leave a few
//! corner nodes outside that a fixpoint would have promoted.

use log::debug;
use rayon::prelude::*;

use super::{Node, NodeClass};
use crate::geometry::Boundary;
use crate::mesh::lattice::NO_NEIGHBOR;

fn live_ports(node: &Node) -> impl Iterator<Item = (usize, usize)> + '_ {
    node.ports
        .iter()
        .enumerate()
        .filter(|(_, &p)| p != NO_NEIGHBOR)
        .map(|(port, &p)| (port, p as usize))
}

/// Per-class node counts: (inside, boundary, reentrant, outside).
pub(crate) fn class_counts(nodes: &[Node]) -> (usize, usize, usize, usize) {
    nodes.iter().fold((0, 0, 0, 0), |mut acc, node| {
        match node.class {
            NodeClass::Inside => acc.0 += 1,
            NodeClass::Boundary(_) => acc.1 += 1,
            NodeClass::Reentrant => acc.2 += 1,
            NodeClass::Outside => acc.3 += 1,
        }
        acc
    })
}

fn log_pass(pass: &str, nodes: &[Node]) {
    let (inside, boundary, reentrant, outside) = class_counts(nodes);
    debug!(
        "{}: {} inside, {} boundary, {} reentrant, {} outside",
        pass, inside, boundary, reentrant, outside
    );
}

/// Inside test with isolated nodes removed.
fn mark_inside<B: Boundary + ?Sized>(nodes: &mut [Node], boundary: &B) {
    let raw: Vec<bool> = nodes
        .par_iter()
        .map(|node| boundary.inside(&node.position))
        .collect();

    nodes.par_iter_mut().enumerate().for_each(|(i, node)| {
        let inside = raw[i] && live_ports(node).any(|(_, n)| raw[n]);
        node.class = if inside {
            NodeClass::Inside
        } else {
            NodeClass::Outside
        };
    });
    log_pass("classification pass 1", nodes);
}

/// Outside nodes with inside neighbors become boundary nodes.
fn promote_boundary(nodes: &mut [Node]) {
    let inside: Vec<bool> = nodes
        .par_iter()
        .map(|node| node.class == NodeClass::Inside)
        .collect();

    nodes.par_iter_mut().for_each(|node| {
        if node.class != NodeClass::Outside {
            return;
        }
        let mask = live_ports(node)
            .filter(|&(_, n)| inside[n])
            .fold(0u8, |mask, (port, _)| mask | (1 << port));
        if mask != 0 {
            node.class = NodeClass::Boundary(mask);
        }
    });
    log_pass("classification pass 2", nodes);
}

/// Multi-port boundary nodes become reentrant; outside nodes behind two
/// distinct single-port walls become two-port boundary nodes.
///
/// An outside node is only promoted when its single-port boundary neighbors
/// face pairwise different walls, and it needs at least two of them. In a
/// box, the edge node at grid `(-1, -1, z)` touches the `-x` and `-y` face
/// nodes and becomes `Boundary(+x | +y)`. The corner node at `(-1, -1, -1)`
/// only touches edge nodes, which are still outside here, so it stays
/// outside. Three distinct walls around one outside node, which happens in
/// concave rooms, give a reentrant node.
fn promote_corners(nodes: &mut [Node]) {
    let snapshot: Vec<NodeClass> = nodes
        .par_iter()
        .map(|node| match node.class {
            NodeClass::Boundary(mask) if mask.count_ones() > 1 => NodeClass::Reentrant,
            class => class,
        })
        .collect();

    nodes.par_iter_mut().enumerate().for_each(|(i, node)| {
        node.class = snapshot[i];
        if node.class != NodeClass::Outside {
            return;
        }

        let mut mask = 0u8;
        let mut seen = 0u8;
        for (port, n) in live_ports(node) {
            if let NodeClass::Boundary(adjacent) = snapshot[n] {
                if adjacent.count_ones() != 1 {
                    continue;
                }
                if seen & adjacent != 0 {
                    // two neighbors facing the same wall: not a corner
                    return;
                }
                seen |= adjacent;
                mask |= 1 << port;
            }
        }
        node.class = match mask.count_ones() {
            0 | 1 => NodeClass::Outside,
            2 => NodeClass::Boundary(mask),
            _ => NodeClass::Reentrant,
        };
    });
    log_pass("classification pass 3", nodes);
}

/// Classify every node of a linked lattice against `boundary`.
pub(crate) fn classify<B: Boundary + ?Sized>(nodes: &mut [Node], boundary: &B) {
    mark_inside(nodes, boundary);
    promote_boundary(nodes);
    promote_corners(nodes);
}
