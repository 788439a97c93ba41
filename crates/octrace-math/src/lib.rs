#![warn(missing_docs)]

//! Math types for the octrace voxel oracle.
//!
//! Thin wrappers around nalgebra providing the two vector flavours the
//! tracing pipeline moves between: integer lattice points (ray positions,
//! box corners, face normals) and floating-point directions. Conversions
//! between the two round half-to-even, which is the rounding the hardware
//! model is validated against.

use nalgebra::Vector3;

/// An integer point on the voxel lattice.
pub type IVec3 = Vector3<i64>;

/// A floating-point vector in world space.
pub type Vec3 = Vector3<f64>;

/// Axis indices in the order the pipeline tests them.
pub const AXES: [usize; 3] = [0, 1, 2];

/// Round a scalar to the nearest integer, ties to even.
#[inline]
pub fn round_half_even(v: f64) -> i64 {
    v.round_ties_even() as i64
}

/// Round every component of `v` to the nearest lattice point, ties to even.
#[inline]
pub fn to_lattice(v: &Vec3) -> IVec3 {
    IVec3::new(
        round_half_even(v.x),
        round_half_even(v.y),
        round_half_even(v.z),
    )
}

/// Widen a lattice point to floating point.
#[inline]
pub fn to_world(p: &IVec3) -> Vec3 {
    Vec3::new(p.x as f64, p.y as f64, p.z as f64)
}

/// Normalize `v`, returning the zero vector when `v` has no length.
pub fn normalize_or_zero(v: &Vec3) -> Vec3 {
    let norm = v.norm();
    if norm > 0.0 && norm.is_finite() {
        v / norm
    } else {
        Vec3::zeros()
    }
}

/// True if every component of `v` is finite.
pub fn is_finite(v: &Vec3) -> bool {
    v.iter().all(|c| c.is_finite())
}

/// Unit lattice vector along `axis`, negated when `positive` is false.
pub fn axis_unit(axis: usize, positive: bool) -> IVec3 {
    let mut n = IVec3::zeros();
    n[axis] = if positive { 1 } else { -1 };
    n
}
