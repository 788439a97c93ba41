//! Frame rendering.
//!
//! Pixels are traced one after another in scan order. The octree, camera
//! and palette are borrowed immutably for the whole frame.

use serde::{Deserialize, Serialize};

use crate::camera::Camera;
use crate::error::Result;
use crate::material::{MaterialTable, MissingMaterial, Rgb, BLACK};
use crate::octree::Octree;
use crate::raster::Raster;
use crate::shade::{shade, ShadingMode};
use crate::stepper::DEFAULT_MAX_STEP_ITERATIONS;
use crate::traverse::{march, MarchLimits, Trace, DEFAULT_MAX_MARCHES};

/// Per-frame rendering options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Shading model for hits.
    pub shading: ShadingMode,
    /// Colour of pixels whose ray leaves the world.
    pub background: Rgb,
    /// Halving iterations allowed per empty-space step.
    pub max_step_iterations: usize,
    /// Descend/step cycles allowed per ray.
    pub max_marches: usize,
    /// Handling of hit materials missing from the palette.
    pub missing_material: MissingMaterial,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            shading: ShadingMode::default(),
            background: BLACK,
            max_step_iterations: DEFAULT_MAX_STEP_ITERATIONS,
            max_marches: DEFAULT_MAX_MARCHES,
            missing_material: MissingMaterial::Fail,
        }
    }
}

impl RenderSettings {
    /// Default settings with flat shading.
    pub fn flat() -> Self {
        Self {
            shading: ShadingMode::Flat,
            ..Self::default()
        }
    }

    /// Iteration bounds for each ray.
    pub fn limits(&self) -> MarchLimits {
        MarchLimits {
            max_step_iterations: self.max_step_iterations,
            max_marches: self.max_marches,
        }
    }
}

/// Trace the ray through pixel `(x, y)` without shading it.
pub fn trace_pixel(
    octree: &Octree,
    camera: &Camera,
    x: u32,
    y: u32,
    settings: &RenderSettings,
) -> Result<Trace> {
    let ray = camera.generate_ray(x, y);
    march(octree, &ray, &settings.limits()).map_err(|e| e.at_pixel(x, y))
}

/// Colour of pixel `(x, y)`.
pub fn render_pixel(
    octree: &Octree,
    camera: &Camera,
    materials: &MaterialTable,
    x: u32,
    y: u32,
    settings: &RenderSettings,
) -> Result<Rgb> {
    match trace_pixel(octree, camera, x, y, settings)? {
        Trace::Hit(hit) => {
            log::trace!(
                "pixel ({x}, {y}) hit material {} at {:?}",
                hit.material,
                hit.position.as_slice()
            );
            shade(
                &hit,
                camera,
                materials,
                settings.shading,
                settings.missing_material,
            )
        }
        Trace::Miss { .. } => Ok(settings.background),
    }
}

/// Render a full frame at the camera's image size.
pub fn render_frame(
    octree: &Octree,
    camera: &Camera,
    materials: &MaterialTable,
    settings: &RenderSettings,
) -> Result<Raster> {
    camera.validate()?;

    let (width, height) = (camera.image_width, camera.image_height);
    log::debug!(
        "rendering {width}x{height} frame, L={}, origin {:?}, shading {:?}",
        octree.bit_length(),
        camera.origin().as_slice(),
        settings.shading
    );

    let mut raster = Raster::new(width, height, settings.background);
    let mut hits = 0usize;
    for y in 0..height {
        for x in 0..width {
            match trace_pixel(octree, camera, x, y, settings)? {
                Trace::Hit(hit) => {
                    hits += 1;
                    let color = shade(
                        &hit,
                        camera,
                        materials,
                        settings.shading,
                        settings.missing_material,
                    )?;
                    raster.set_pixel(x, y, color);
                }
                Trace::Miss { .. } => {}
            }
        }
    }

    log::debug!(
        "frame done: {hits} of {} pixels hit",
        width as usize * height as usize
    );
    Ok(raster)
}
