//! Volume predicates and bounding boxes.
//!
//! The mesh builder only needs to know whether a point is inside the room,
//! the room's bounding box, and which surface material is nearest a point.
//! Scene import lives elsewhere; these shapes cover the analytic rooms used
//! for testing and for quick simulations.

use nalgebra::Vector3;

use crate::error::{Result, WaveguideError};

/// 3D point or vector in metres.
pub type Vec3 = Vector3<f64>;

/// Integer lattice coordinate.
pub type IVec3 = Vector3<i64>;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Edge lengths.
    pub fn dimensions(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn centre(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Inclusive containment test.
    pub fn contains(&self, p: &Vec3) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] && p[i] <= self.max[i])
    }

    fn is_finite(&self) -> bool {
        self.min.iter().chain(self.max.iter()).all(|v| v.is_finite())
    }
}

/// Inside/outside predicate over a closed volume.
///
/// Implementations must be `Sync`: the mesh builder evaluates the predicate
/// from several threads at once.
pub trait Boundary: Sync {
    /// Bounding box of the volume.
    fn aabb(&self) -> Aabb;

    /// Whether `p` lies inside the volume.
    fn inside(&self, p: &Vec3) -> bool;

    /// Index of the surface material nearest `p`.
    fn material_index(&self, _p: &Vec3) -> usize {
        0
    }
}

/// Shoebox room with one material per face.
///
/// Face order is -x, +x, -y, +y, -z, +z.
#[derive(Debug, Clone)]
pub struct CuboidBoundary {
    aabb: Aabb,
    materials: [usize; 6],
}

impl CuboidBoundary {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            aabb: Aabb::new(min, max),
            materials: [0; 6],
        }
    }

    /// Assign a material index to each face.
    pub fn with_materials(mut self, materials: [usize; 6]) -> Self {
        self.materials = materials;
        self
    }
}

impl Boundary for CuboidBoundary {
    fn aabb(&self) -> Aabb {
        self.aabb
    }

    fn inside(&self, p: &Vec3) -> bool {
        self.aabb.contains(p)
    }

    fn material_index(&self, p: &Vec3) -> usize {
        let distances = [
            (p.x - self.aabb.min.x).abs(),
            (p.x - self.aabb.max.x).abs(),
            (p.y - self.aabb.min.y).abs(),
            (p.y - self.aabb.max.y).abs(),
            (p.z - self.aabb.min.z).abs(),
            (p.z - self.aabb.max.z).abs(),
        ];
        let nearest = distances
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap_or(0);
        self.materials[nearest]
    }
}

/// L-shaped room, extruded along z.
///
/// The footprint is two rectangles sharing the x = 0 wall:
/// - Region 1: x in [0, width1], y in [0, depth1]
/// - Region 2: x in [0, width2], y in [depth1, depth1 + depth2]
///
/// With `width2 < width1` the corner at (width2, depth1) is concave, which
/// is what exercises reentrant node classification.
#[derive(Debug, Clone)]
pub struct LShapedBoundary {
    pub width1: f64,
    pub depth1: f64,
    pub width2: f64,
    pub depth2: f64,
    pub height: f64,
    pub material: usize,
}

impl LShapedBoundary {
    pub fn new(width1: f64, depth1: f64, width2: f64, depth2: f64, height: f64) -> Self {
        Self {
            width1,
            depth1,
            width2,
            depth2,
            height,
            material: 0,
        }
    }

    /// Check if a 2D point (x, y) is inside the footprint
    pub fn contains_xy(&self, x: f64, y: f64) -> bool {
        let total_depth = self.depth1 + self.depth2;
        if x >= 0.0 && x <= self.width1 && y >= 0.0 && y <= self.depth1 {
            return true;
        }
        x >= 0.0 && x <= self.width2 && y >= self.depth1 && y <= total_depth
    }
}

impl Boundary for LShapedBoundary {
    fn aabb(&self) -> Aabb {
        Aabb::new(
            Vec3::zeros(),
            Vec3::new(
                self.width1.max(self.width2),
                self.depth1 + self.depth2,
                self.height,
            ),
        )
    }

    fn inside(&self, p: &Vec3) -> bool {
        self.contains_xy(p.x, p.y) && p.z >= 0.0 && p.z <= self.height
    }

    fn material_index(&self, _p: &Vec3) -> usize {
        self.material
    }
}

/// Spherical volume.
#[derive(Debug, Clone)]
pub struct SphereBoundary {
    pub centre: Vec3,
    pub radius: f64,
    pub material: usize,
}

impl SphereBoundary {
    pub fn new(centre: Vec3, radius: f64) -> Self {
        Self {
            centre,
            radius,
            material: 0,
        }
    }
}

impl Boundary for SphereBoundary {
    fn aabb(&self) -> Aabb {
        let r = Vec3::repeat(self.radius);
        Aabb::new(self.centre - r, self.centre + r)
    }

    fn inside(&self, p: &Vec3) -> bool {
        (p - self.centre).norm_squared() <= self.radius * self.radius
    }

    fn material_index(&self, _p: &Vec3) -> usize {
        self.material
    }
}

/// Grow `aabb` so that `anchor` falls exactly on a lattice point.
///
/// Each side is pushed out to a whole number of spacings from the anchor,
/// plus one extra cell, so the outermost nodes always sit outside the
/// original box.
pub fn compute_adjusted_boundary(aabb: &Aabb, anchor: &Vec3, spacing: f64) -> Result<Aabb> {
    if !(spacing.is_finite() && spacing > 0.0) {
        return Err(WaveguideError::config(format!(
            "mesh spacing ({}) must be positive",
            spacing
        )));
    }
    if !aabb.is_finite() || anchor.iter().any(|v| !v.is_finite()) {
        return Err(WaveguideError::config("non-finite bounding box or anchor"));
    }

    let mut min = Vec3::zeros();
    let mut max = Vec3::zeros();
    for axis in 0..3 {
        let below = ((anchor[axis] - aabb.min[axis]).max(0.0) / spacing).ceil() + 1.0;
        let above = ((aabb.max[axis] - anchor[axis]).max(0.0) / spacing).ceil() + 1.0;
        min[axis] = anchor[axis] - below * spacing;
        max[axis] = anchor[axis] + above * spacing;
    }
    Ok(Aabb::new(min, max))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjusted_boundary_is_anchor_aligned() {
        let aabb = Aabb::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(4.0, 3.0, 6.0));
        let anchor = Vec3::new(2.1, 1.37, 0.9);
        let spacing = 0.3;

        let adjusted = compute_adjusted_boundary(&aabb, &anchor, spacing).unwrap();
        let again = compute_adjusted_boundary(&aabb, &anchor, spacing).unwrap();
        assert_eq!(adjusted, again);

        for axis in 0..3 {
            let cells = (anchor[axis] - adjusted.min[axis]) / spacing;
            assert!((cells - cells.round()).abs() < 1e-9);
            assert!(adjusted.min[axis] < aabb.min[axis]);
            assert!(adjusted.max[axis] > aabb.max[axis]);
        }
    }

    #[test]
    fn test_adjusted_boundary_rejects_bad_spacing() {
        let aabb = Aabb::new(Vec3::zeros(), Vec3::repeat(1.0));
        assert!(compute_adjusted_boundary(&aabb, &Vec3::zeros(), 0.0).is_err());
        assert!(compute_adjusted_boundary(&aabb, &Vec3::zeros(), f64::NAN).is_err());
    }

    #[test]
    fn test_l_shape_contains() {
        let room = LShapedBoundary::new(6.0, 4.0, 3.0, 3.0, 2.5);
        assert!(room.inside(&Vec3::new(5.0, 2.0, 1.0)));
        assert!(room.inside(&Vec3::new(2.0, 6.0, 1.0)));
        // cut-out corner
        assert!(!room.inside(&Vec3::new(5.0, 6.0, 1.0)));
        assert!(!room.inside(&Vec3::new(2.0, 2.0, 3.0)));
    }

    #[test]
    fn test_cuboid_nearest_face_material() {
        let room = CuboidBoundary::new(Vec3::zeros(), Vec3::new(10.0, 10.0, 10.0))
            .with_materials([0, 1, 2, 3, 4, 5]);
        assert_eq!(room.material_index(&Vec3::new(-0.5, 5.0, 5.0)), 0);
        assert_eq!(room.material_index(&Vec3::new(10.5, 5.0, 5.0)), 1);
        assert_eq!(room.material_index(&Vec3::new(5.0, 5.0, 10.7)), 5);
    }
}
