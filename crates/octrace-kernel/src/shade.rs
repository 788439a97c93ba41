//! Hit shading: face normal recovery, head-light brightness, gamma.

use octrace_math::{axis_unit, normalize_or_zero, to_world, IVec3, Vec3, AXES};
use serde::{Deserialize, Serialize};

use crate::aabb::Aabb;
use crate::camera::Camera;
use crate::error::Result;
use crate::material::{MaterialTable, MissingMaterial, Rgb};
use crate::traverse::Hit;

/// Gamma used by the lit shading mode unless configured otherwise.
pub const DEFAULT_GAMMA: f64 = 2.2;

/// How a hit is turned into a colour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ShadingMode {
    /// Raw material colour.
    Flat,
    /// Material colour scaled by squared head-light brightness, then
    /// gamma-corrected.
    Lit {
        /// Display gamma.
        gamma: f64,
    },
}

impl Default for ShadingMode {
    fn default() -> Self {
        ShadingMode::Lit {
            gamma: DEFAULT_GAMMA,
        }
    }
}

/// Outward normal of the box face `position` lies on.
///
/// Faces are tested in the order x-min, x-max, y-min, y-max, z-min, z-max
/// and the first match wins. A position on no face gets the zero vector.
pub fn surface_normal(position: &IVec3, aabb: &Aabb) -> IVec3 {
    for axis in AXES {
        if position[axis] == aabb.min[axis] {
            return axis_unit(axis, false);
        }
        if position[axis] == aabb.max[axis] {
            return axis_unit(axis, true);
        }
    }
    IVec3::zeros()
}

/// Squared cosine between the light direction and the normal.
pub fn brightness(light_dir: &Vec3, normal: &IVec3) -> f64 {
    light_dir.dot(&to_world(normal)).powi(2)
}

/// `255 * (c / 255)^(1 / gamma)`, clamped and truncated to 8 bits.
pub fn gamma_correct(channel: u8, gamma: f64) -> u8 {
    (255.0 * (channel as f64 / 255.0).powf(1.0 / gamma)).clamp(0.0, 255.0) as u8
}

/// Colour of `hit` as seen from `camera`.
pub fn shade(
    hit: &Hit,
    camera: &Camera,
    materials: &MaterialTable,
    mode: ShadingMode,
    missing: MissingMaterial,
) -> Result<Rgb> {
    let base = materials.resolve(hit.material, missing)?;
    let gamma = match mode {
        ShadingMode::Flat => return Ok(base),
        ShadingMode::Lit { gamma } => gamma,
    };

    let normal = surface_normal(&hit.position, &hit.aabb);
    let light_dir = normalize_or_zero(&(camera.position - to_world(&hit.position)));
    let factor = brightness(&light_dir, &normal);

    Ok(base.map(|c| {
        let lit = (c as f64 * factor).clamp(0.0, 255.0) as u8;
        gamma_correct(lit, gamma)
    }))
}
