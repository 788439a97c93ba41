//! Empty-space exit search.
//!
//! Moves a lattice position out of an empty box along a direction using
//! only doubling, halving and rounding, the operations the hardware stepper
//! implements. The result is the first position found exactly one unit past
//! a face of the box.

use octrace_math::{is_finite, to_lattice, to_world, IVec3, Vec3};

use crate::aabb::Aabb;
use crate::error::{KernelError, Result};

/// Default bound on halving iterations per step.
pub const DEFAULT_MAX_STEP_ITERATIONS: usize = 4096;

/// Result of one exit search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    /// Position just outside the box.
    pub position: IVec3,
    /// Direction after the search, carrying its final scale.
    ///
    /// Feed this into the next step to reproduce the reference pipeline,
    /// which rescales one direction register across the whole ray.
    pub direction: Vec3,
    /// Halving iterations spent.
    pub iterations: usize,
}

/// Advance `position` along `direction` until it sits just outside `aabb`.
///
/// `position` must be inside or on the boundary of `aabb`. A position that is
/// already just outside is returned unchanged. Fails with
/// [`KernelError::TraversalDivergence`] if the direction is unusable or the
/// exit is not found within `max_iterations` halvings.
pub fn step(
    position: &IVec3,
    direction: &Vec3,
    aabb: &Aabb,
    max_iterations: usize,
) -> Result<StepOutcome> {
    search(position, direction, aabb, max_iterations, |_, _| {})
}

/// Exit search reporting every accepted position and the direction that
/// produced it.
pub(crate) fn search<F>(
    position: &IVec3,
    direction: &Vec3,
    aabb: &Aabb,
    max_iterations: usize,
    mut on_accept: F,
) -> Result<StepOutcome>
where
    F: FnMut(&IVec3, &Vec3),
{
    let diverged = |position: &IVec3, direction: &Vec3, iterations| {
        KernelError::TraversalDivergence {
            pixel: None,
            position: [position.x, position.y, position.z],
            direction: [direction.x, direction.y, direction.z],
            iterations,
        }
    };

    if !is_finite(direction) || direction.norm() == 0.0 {
        return Err(diverged(position, direction, 0));
    }

    // Scale up so a single step can clear the far face.
    let size = aabb.size() as f64;
    let mut dir = *direction;
    while dir.norm() < size {
        dir *= 2.0;
    }

    let mut pos = *position;
    let mut iterations = 0;
    while !aabb.just_outside(&pos) {
        if iterations == max_iterations {
            return Err(diverged(&pos, &dir, iterations));
        }
        iterations += 1;

        let candidate = to_lattice(&(to_world(&pos) + dir));
        if aabb.contains(&candidate) || aabb.just_outside(&candidate) {
            pos = candidate;
            on_accept(&pos, &dir);
        }
        dir /= 2.0;
    }

    Ok(StepOutcome {
        position: pos,
        direction: dir,
        iterations,
    })
}
