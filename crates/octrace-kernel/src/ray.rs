//! Rays cast through the voxel lattice.

use octrace_math::{to_lattice, IVec3, Vec3};

/// A ray starting on a lattice point.
///
/// The origin is integer because the hardware addresses voxels directly
/// from position bits; only the direction carries fractional precision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Origin lattice point.
    pub origin: IVec3,
    /// Direction; unit length when produced by a camera.
    pub direction: Vec3,
}

impl Ray {
    /// Create a ray from a lattice origin and a direction.
    pub fn new(origin: IVec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Create a ray from a world-space origin, rounding it half-to-even.
    pub fn from_world(origin: &Vec3, direction: Vec3) -> Self {
        Self::new(to_lattice(origin), direction)
    }
}
