//! Per-ray traversal: descend, step through empty space, repeat.
//!
//! Every iteration restarts address decoding at the root with the new
//! position, and each step exits the box of the leaf the previous descent
//! found. A ray grazing a corner can therefore skip a neighbouring leaf,
//! exactly as the hardware does.

use octrace_math::{IVec3, Vec3};

use crate::aabb::Aabb;
use crate::error::{KernelError, Result};
use crate::octree::{MaterialId, Octree, EMPTY};
use crate::ray::Ray;
use crate::stepper::{step, DEFAULT_MAX_STEP_ITERATIONS};

/// Default bound on descend/step cycles per ray.
pub const DEFAULT_MAX_MARCHES: usize = 1 << 16;

/// Iteration bounds for one ray.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarchLimits {
    /// Halving iterations allowed per step.
    pub max_step_iterations: usize,
    /// Descend/step cycles allowed per ray.
    pub max_marches: usize,
}

impl Default for MarchLimits {
    fn default() -> Self {
        Self {
            max_step_iterations: DEFAULT_MAX_STEP_ITERATIONS,
            max_marches: DEFAULT_MAX_MARCHES,
        }
    }
}

/// A surface hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    /// Lattice position where the occupied leaf was entered.
    pub position: IVec3,
    /// Bounds of the occupied leaf.
    pub aabb: Aabb,
    /// Material of the occupied leaf (never [`EMPTY`]).
    pub material: MaterialId,
    /// Descend/step cycles spent, including the final descent.
    pub marches: usize,
}

/// Terminal state of a ray.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trace {
    /// The ray entered an occupied leaf.
    Hit(Hit),
    /// The ray left the world without hitting anything.
    Miss {
        /// Descend/step cycles spent before leaving.
        marches: usize,
    },
}

impl Trace {
    /// The hit, if any.
    pub fn hit(&self) -> Option<&Hit> {
        match self {
            Trace::Hit(hit) => Some(hit),
            Trace::Miss { .. } => None,
        }
    }
}

enum MarchState {
    Marching { position: IVec3, direction: Vec3 },
    Done(Trace),
}

/// Follow `ray` through `octree` to its first occupied leaf.
///
/// A ray whose origin is outside the world misses immediately.
pub fn march(octree: &Octree, ray: &Ray, limits: &MarchLimits) -> Result<Trace> {
    let world = octree.world();
    let mut marches = 0;
    let mut state = MarchState::Marching {
        position: ray.origin,
        direction: ray.direction,
    };

    loop {
        state = match state {
            MarchState::Done(trace) => return Ok(trace),
            MarchState::Marching { position, .. } if !world.contains(&position) => {
                MarchState::Done(Trace::Miss { marches })
            }
            MarchState::Marching {
                position,
                direction,
            } => {
                if marches == limits.max_marches {
                    return Err(KernelError::TraversalDivergence {
                        pixel: None,
                        position: [position.x, position.y, position.z],
                        direction: [direction.x, direction.y, direction.z],
                        iterations: marches,
                    });
                }
                marches += 1;

                let descent = octree.descend(&position);
                if descent.material == EMPTY {
                    let out = step(
                        &position,
                        &direction,
                        &descent.aabb,
                        limits.max_step_iterations,
                    )?;
                    MarchState::Marching {
                        position: out.position,
                        direction: out.direction,
                    }
                } else {
                    MarchState::Done(Trace::Hit(Hit {
                        position,
                        aabb: descent.aabb,
                        material: descent.material,
                        marches,
                    }))
                }
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corner_tree() -> Octree {
        Octree::from_json("[0,0,0,0,0,0,0,1]", 2).unwrap()
    }

    #[test]
    fn test_forward_ray_hits_corner_leaf() {
        let ray = Ray::new(IVec3::new(3, 3, 0), Vec3::z());
        let trace = march(&corner_tree(), &ray, &MarchLimits::default()).unwrap();
        let hit = trace.hit().expect("expected a hit");
        assert_eq!(hit.material, 1);
        assert_eq!(hit.position, IVec3::new(3, 3, 2));
        assert_eq!(hit.aabb, Aabb::cube(IVec3::new(2, 2, 2), 2));
        assert_eq!(hit.marches, 2);
    }

    #[test]
    fn test_ray_away_from_leaf_misses() {
        let ray = Ray::new(IVec3::new(3, 3, 0), -Vec3::z());
        let trace = march(&corner_tree(), &ray, &MarchLimits::default()).unwrap();
        assert_eq!(trace, Trace::Miss { marches: 1 });
    }

    #[test]
    fn test_origin_outside_world_misses_immediately() {
        let ray = Ray::new(IVec3::new(-1, 0, 0), Vec3::x());
        let trace = march(&corner_tree(), &ray, &MarchLimits::default()).unwrap();
        assert_eq!(trace, Trace::Miss { marches: 0 });
    }

    #[test]
    fn test_origin_inside_occupied_leaf_hits_at_origin() {
        let ray = Ray::new(IVec3::new(2, 2, 2), Vec3::z());
        let hit = *march(&corner_tree(), &ray, &MarchLimits::default())
            .unwrap()
            .hit()
            .unwrap();
        assert_eq!(hit.position, IVec3::new(2, 2, 2));
        assert_eq!(hit.marches, 1);
    }

    #[test]
    fn test_crosses_several_empty_leaves() {
        let mut tree = Octree::uniform(EMPTY, 10).unwrap();
        tree.set_cell(&IVec3::new(200, 300, 900), 10, 4).unwrap();
        let ray = Ray::new(IVec3::new(200, 300, 0), Vec3::z());
        let hit = *march(&tree, &ray, &MarchLimits::default())
            .unwrap()
            .hit()
            .unwrap();
        assert_eq!(hit.material, 4);
        assert_eq!(hit.position, IVec3::new(200, 300, 900));
        assert_eq!(hit.aabb, Aabb::cube(IVec3::new(200, 300, 900), 1));
        assert!(hit.marches > 2);
    }

    #[test]
    fn test_march_bound_reports_divergence() {
        let mut tree = Octree::uniform(EMPTY, 10).unwrap();
        tree.set_cell(&IVec3::new(200, 300, 900), 10, 4).unwrap();
        let ray = Ray::new(IVec3::new(200, 300, 0), Vec3::z());
        let limits = MarchLimits {
            max_marches: 2,
            ..MarchLimits::default()
        };
        let err = march(&tree, &ray, &limits).unwrap_err();
        assert!(matches!(
            err,
            KernelError::TraversalDivergence { iterations: 2, .. }
        ));
    }
}
