//! Lattice topologies: index/locator bijection, positions and neighbors.

use crate::config::Topology;
use crate::geometry::{Aabb, IVec3, Vec3};

/// Sentinel for a port with no neighbor.
pub const NO_NEIGHBOR: u32 = u32::MAX;

/// Largest port count over all topologies.
pub const MAX_PORTS: usize = 6;

/// Neighbor indices of one node. Unused slots hold [`NO_NEIGHBOR`].
pub type Ports = [u32; MAX_PORTS];

/// Nodes per tetrahedral unit cube.
pub const CUBE_NODES: usize = 8;

/// Structured lattice coordinate.
///
/// `pos` is the grid position (rectangular) or unit-cube position
/// (tetrahedral); `sub` is the position inside the cube and is always 0 on
/// the rectangular lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Locator {
    pub pos: IVec3,
    pub sub: usize,
}

impl Locator {
    pub fn new(pos: IVec3, sub: usize) -> Self {
        Self { pos, sub }
    }

    pub fn grid(x: i64, y: i64, z: i64) -> Self {
        Self::new(IVec3::new(x, y, z), 0)
    }
}

/// Node positions inside a unit cube.
const BASIC_CUBE: [[f64; 3]; CUBE_NODES] = [
    [0.00, 0.00, 0.00],
    [0.50, 0.00, 0.50],
    [0.25, 0.25, 0.25],
    [0.75, 0.25, 0.75],
    [0.00, 0.50, 0.50],
    [0.50, 0.50, 0.00],
    [0.25, 0.75, 0.75],
    [0.75, 0.75, 0.25],
];

/// For each sub-position, the (cube offset, sub-position) of its 4 neighbors.
/// Even sub-positions point one way, odd ones the other.
const OFFSET_TABLE: [[([i64; 3], usize); 4]; CUBE_NODES] = [
    [([0, 0, 0], 2), ([-1, 0, -1], 3), ([0, -1, -1], 6), ([-1, -1, 0], 7)],
    [([0, 0, 0], 2), ([0, 0, 0], 3), ([0, -1, 0], 6), ([0, -1, 0], 7)],
    [([0, 0, 0], 0), ([0, 0, 0], 1), ([0, 0, 0], 4), ([0, 0, 0], 5)],
    [([1, 0, 1], 0), ([0, 0, 0], 1), ([1, 0, 0], 4), ([0, 0, 1], 5)],
    [([0, 0, 0], 2), ([-1, 0, 0], 3), ([0, 0, 0], 6), ([-1, 0, 0], 7)],
    [([0, 0, 0], 2), ([0, 0, -1], 3), ([0, 0, -1], 6), ([0, 0, 0], 7)],
    [([0, 1, 1], 0), ([0, 1, 0], 1), ([0, 0, 0], 4), ([0, 0, 1], 5)],
    [([1, 1, 0], 0), ([0, 1, 0], 1), ([1, 0, 0], 4), ([0, 0, 0], 5)],
];

/// Rectangular port offsets: -x, +x, -y, +y, -z, +z.
const RECT_OFFSETS: [[i64; 3]; 6] = [
    [-1, 0, 0],
    [1, 0, 0],
    [0, -1, 0],
    [0, 1, 0],
    [0, 0, -1],
    [0, 0, 1],
];

/// Cube side that gives the requested node spacing on the tetrahedral lattice.
pub fn cube_side_from_node_spacing(spacing: f64) -> f64 {
    spacing / Vec3::repeat(0.25).norm()
}

fn in_range(pos: &IVec3, dim: &IVec3) -> bool {
    (0..3).all(|i| pos[i] >= 0 && pos[i] < dim[i])
}

fn to_vec3(v: [f64; 3]) -> Vec3 {
    Vec3::new(v[0], v[1], v[2])
}

/// Cartesian lattice.
#[derive(Debug, Clone)]
pub struct RectangularLattice {
    min: Vec3,
    spacing: f64,
    dim: IVec3,
}

impl RectangularLattice {
    /// Lattice points covering `aabb`, both faces included.
    pub fn new(aabb: &Aabb, spacing: f64) -> Self {
        let extent = aabb.dimensions() / spacing;
        let dim = IVec3::new(
            (extent.x.round() as i64).saturating_add(1),
            (extent.y.round() as i64).saturating_add(1),
            (extent.z.round() as i64).saturating_add(1),
        );
        Self {
            min: aabb.min,
            spacing,
            dim,
        }
    }

    fn compute_index(&self, loc: &Locator) -> usize {
        let d = &self.dim;
        (loc.pos.x + loc.pos.y * d.x + loc.pos.z * d.x * d.y) as usize
    }

    fn compute_locator(&self, index: usize) -> Locator {
        let i = index as i64;
        let d = &self.dim;
        Locator::grid(i % d.x, (i / d.x) % d.y, i / (d.x * d.y))
    }

    fn compute_position(&self, loc: &Locator) -> Vec3 {
        self.min + loc.pos.map(|v| v as f64) * self.spacing
    }

    fn nearest_locator(&self, v: &Vec3) -> Locator {
        let scaled = (v - self.min) / self.spacing;
        let mut best = Locator::grid(0, 0, 0);
        let mut best_dist = f64::INFINITY;
        let centre = IVec3::from_fn(|i, _| (scaled[i].round() as i64).clamp(0, self.dim[i] - 1));
        for x in (centre.x - 1).max(0)..(centre.x + 2).min(self.dim.x) {
            for y in (centre.y - 1).max(0)..(centre.y + 2).min(self.dim.y) {
                for z in (centre.z - 1).max(0)..(centre.z + 2).min(self.dim.z) {
                    let loc = Locator::grid(x, y, z);
                    let dist = (v - self.compute_position(&loc)).norm_squared();
                    if dist < best_dist {
                        best = loc;
                        best_dist = dist;
                    }
                }
            }
        }
        best
    }

    fn neighbors(&self, index: usize) -> Ports {
        let loc = self.compute_locator(index);
        let mut ports = [NO_NEIGHBOR; MAX_PORTS];
        for (port, offset) in ports.iter_mut().zip(RECT_OFFSETS.iter()) {
            let pos = loc.pos + IVec3::new(offset[0], offset[1], offset[2]);
            if in_range(&pos, &self.dim) {
                *port = self.compute_index(&Locator::new(pos, 0)) as u32;
            }
        }
        ports
    }
}

/// Tetrahedral lattice built from 8-node unit cubes.
#[derive(Debug, Clone)]
pub struct TetrahedralLattice {
    min: Vec3,
    cube_side: f64,
    dim: IVec3,
    scaled_cube: [Vec3; CUBE_NODES],
}

impl TetrahedralLattice {
    /// Unit cubes covering `aabb`; `aabb` should already be aligned to the cube side.
    pub fn new(aabb: &Aabb, cube_side: f64) -> Self {
        let extent = aabb.dimensions() / cube_side;
        let dim = IVec3::new(
            extent.x.round() as i64,
            extent.y.round() as i64,
            extent.z.round() as i64,
        );
        let scaled_cube = BASIC_CUBE.map(|p| to_vec3(p) * cube_side);
        Self {
            min: aabb.min,
            cube_side,
            dim,
            scaled_cube,
        }
    }

    pub fn cube_side(&self) -> f64 {
        self.cube_side
    }

    fn compute_index(&self, loc: &Locator) -> usize {
        let n = CUBE_NODES as i64;
        let d = &self.dim;
        (loc.sub as i64 + loc.pos.x * n + loc.pos.y * d.x * n + loc.pos.z * d.x * d.y * n) as usize
    }

    fn compute_locator(&self, index: usize) -> Locator {
        let n = CUBE_NODES;
        let sub = index % n;
        let cube = (index / n) as i64;
        let d = &self.dim;
        Locator::new(IVec3::new(cube % d.x, (cube / d.x) % d.y, cube / (d.x * d.y)), sub)
    }

    fn compute_position(&self, loc: &Locator) -> Vec3 {
        self.min + loc.pos.map(|v| v as f64) * self.cube_side + self.scaled_cube[loc.sub]
    }

    fn nearest_locator(&self, v: &Vec3) -> Locator {
        let scaled = (v - self.min) / self.cube_side;
        let centre = IVec3::from_fn(|i, _| (scaled[i].floor() as i64).clamp(0, self.dim[i] - 1));
        let mut best = Locator::grid(0, 0, 0);
        let mut best_dist = f64::INFINITY;
        for x in (centre.x - 1).max(0)..(centre.x + 2).min(self.dim.x) {
            for y in (centre.y - 1).max(0)..(centre.y + 2).min(self.dim.y) {
                for z in (centre.z - 1).max(0)..(centre.z + 2).min(self.dim.z) {
                    for sub in 0..CUBE_NODES {
                        let loc = Locator::new(IVec3::new(x, y, z), sub);
                        let dist = (v - self.compute_position(&loc)).norm_squared();
                        if dist < best_dist {
                            best = loc;
                            best_dist = dist;
                        }
                    }
                }
            }
        }
        best
    }

    fn neighbors(&self, index: usize) -> Ports {
        let loc = self.compute_locator(index);
        let mut ports = [NO_NEIGHBOR; MAX_PORTS];
        for (port, (offset, sub)) in ports.iter_mut().zip(OFFSET_TABLE[loc.sub].iter()) {
            let pos = loc.pos + IVec3::new(offset[0], offset[1], offset[2]);
            if in_range(&pos, &self.dim) {
                *port = self.compute_index(&Locator::new(pos, *sub)) as u32;
            }
        }
        ports
    }

    fn port_direction(&self, sub: usize, port: usize) -> Vec3 {
        let (offset, target) = OFFSET_TABLE[sub][port];
        let delta = to_vec3([offset[0] as f64, offset[1] as f64, offset[2] as f64]) * self.cube_side
            + self.scaled_cube[target]
            - self.scaled_cube[sub];
        delta.normalize()
    }
}

/// Lattice of either topology.
#[derive(Debug, Clone)]
pub enum Lattice {
    Rectangular(RectangularLattice),
    Tetrahedral(TetrahedralLattice),
}

impl Lattice {
    pub fn topology(&self) -> Topology {
        match self {
            Lattice::Rectangular(_) => Topology::Rectangular,
            Lattice::Tetrahedral(_) => Topology::Tetrahedral,
        }
    }

    /// Grid points (rectangular) or unit cubes (tetrahedral) per axis.
    pub fn dim(&self) -> IVec3 {
        match self {
            Lattice::Rectangular(l) => l.dim,
            Lattice::Tetrahedral(l) => l.dim,
        }
    }

    /// Node count, or `None` if it does not fit in a `usize`.
    pub fn num_nodes(&self) -> Option<usize> {
        let per_cell = match self {
            Lattice::Rectangular(_) => 1,
            Lattice::Tetrahedral(_) => CUBE_NODES as i64,
        };
        let d = self.dim();
        [d.x, d.y, d.z]
            .iter()
            .try_fold(per_cell, |acc: i64, &n| acc.checked_mul(n.max(0)))
            .and_then(|n| usize::try_from(n).ok())
    }

    /// Whether `loc` names a node of this lattice.
    pub fn contains(&self, loc: &Locator) -> bool {
        let sub_ok = match self {
            Lattice::Rectangular(_) => loc.sub == 0,
            Lattice::Tetrahedral(_) => loc.sub < CUBE_NODES,
        };
        sub_ok && in_range(&loc.pos, &self.dim())
    }

    pub fn compute_index(&self, loc: &Locator) -> usize {
        match self {
            Lattice::Rectangular(l) => l.compute_index(loc),
            Lattice::Tetrahedral(l) => l.compute_index(loc),
        }
    }

    pub fn compute_locator(&self, index: usize) -> Locator {
        match self {
            Lattice::Rectangular(l) => l.compute_locator(index),
            Lattice::Tetrahedral(l) => l.compute_locator(index),
        }
    }

    pub fn compute_position(&self, loc: &Locator) -> Vec3 {
        match self {
            Lattice::Rectangular(l) => l.compute_position(loc),
            Lattice::Tetrahedral(l) => l.compute_position(loc),
        }
    }

    /// Locator of the node closest to `v` (clamped to the lattice).
    pub fn nearest_locator(&self, v: &Vec3) -> Locator {
        match self {
            Lattice::Rectangular(l) => l.nearest_locator(v),
            Lattice::Tetrahedral(l) => l.nearest_locator(v),
        }
    }

    pub fn neighbors(&self, index: usize) -> Ports {
        match self {
            Lattice::Rectangular(l) => l.neighbors(index),
            Lattice::Tetrahedral(l) => l.neighbors(index),
        }
    }

    /// Unit vectors from a node towards each of its ports, in port order.
    ///
    /// Defined for every port, whether or not the neighbor exists.
    pub fn port_directions(&self, index: usize) -> Vec<Vec3> {
        match self {
            Lattice::Rectangular(_) => RECT_OFFSETS
                .iter()
                .map(|o| Vec3::new(o[0] as f64, o[1] as f64, o[2] as f64))
                .collect(),
            Lattice::Tetrahedral(l) => {
                let sub = l.compute_locator(index).sub;
                (0..4).map(|port| l.port_direction(sub, port)).collect()
            }
        }
    }
}
