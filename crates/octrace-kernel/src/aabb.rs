//! Integer axis-aligned boxes on the voxel lattice.
//!
//! Every box the tracer handles is a cube with a power-of-two side and
//! inclusive corners, so `max = min + size - 1` on each axis.

use octrace_math::IVec3;

/// Axis-aligned lattice box with inclusive integer corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aabb {
    /// Minimum corner (inclusive).
    pub min: IVec3,
    /// Maximum corner (inclusive).
    pub max: IVec3,
}

impl Aabb {
    /// Create a box from inclusive corners.
    pub fn new(min: IVec3, max: IVec3) -> Self {
        Self { min, max }
    }

    /// Cube of side `size` whose minimum corner is `min`.
    pub fn cube(min: IVec3, size: i64) -> Self {
        let extent = IVec3::repeat(size - 1);
        Self {
            min,
            max: min + extent,
        }
    }

    /// The world box `[0, 2^L - 1]^3` for bit length `L`.
    pub fn world(bit_length: u32) -> Self {
        Self::cube(IVec3::zeros(), 1i64 << bit_length)
    }

    /// Side length; boxes are cubes so the x extent is representative.
    #[inline]
    pub fn size(&self) -> i64 {
        self.max.x - self.min.x + 1
    }

    /// Test if `p` lies inside the box (boundary included).
    #[inline]
    pub fn contains(&self, p: &IVec3) -> bool {
        (0..3).all(|a| p[a] >= self.min[a] && p[a] <= self.max[a])
    }

    /// Test if `p` sits exactly one unit past a face on at least one axis.
    ///
    /// The remaining axes are unconstrained: a point may be far outside the
    /// box on one axis and still count.
    #[inline]
    pub fn just_outside(&self, p: &IVec3) -> bool {
        (0..3).any(|a| p[a] == self.min[a] - 1 || p[a] == self.max[a] + 1)
    }

    /// The child box selected by a 3-bit octant code (z bit high, x bit low).
    pub fn child(&self, octant: u8) -> Self {
        let half = self.size() / 2;
        let bits = IVec3::new(
            (octant & 1) as i64,
            ((octant >> 1) & 1) as i64,
            ((octant >> 2) & 1) as i64,
        );
        Self::cube(self.min + bits * half, half)
    }
}
