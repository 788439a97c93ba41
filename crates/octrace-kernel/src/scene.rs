//! Scene documents: octree, palette, camera and render settings in one JSON file.

use octrace_math::Vec3;
use serde::{Deserialize, Serialize};

use crate::camera::Camera;
use crate::error::{KernelError, Result};
use crate::material::MaterialTable;
use crate::octree::{NodeSource, Octree, OctreeNode};
use crate::raster::Raster;
use crate::render::{render_frame, trace_pixel, RenderSettings};
use crate::traverse::Trace;

/// Everything needed to render a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SceneDocument", into = "SceneDocument")]
pub struct Scene {
    /// Voxel world.
    pub octree: Octree,
    /// Material palette.
    pub materials: MaterialTable,
    /// Viewpoint and image size.
    pub camera: Camera,
    /// Shading and iteration limits.
    pub settings: RenderSettings,
}

/// On-disk layout of a scene.
///
/// The octree stays in its untyped nested form until the scene is built,
/// so shape errors surface as [`KernelError::Structural`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneDocument {
    bit_length: u32,
    octree: NodeSource,
    #[serde(default)]
    materials: MaterialTable,
    camera: Camera,
    #[serde(default)]
    settings: RenderSettings,
}

impl TryFrom<SceneDocument> for Scene {
    type Error = KernelError;

    fn try_from(doc: SceneDocument) -> Result<Self> {
        Ok(Self {
            octree: Octree::new(OctreeNode::try_from(doc.octree)?, doc.bit_length)?,
            materials: doc.materials,
            camera: doc.camera,
            settings: doc.settings,
        })
    }
}

impl From<Scene> for SceneDocument {
    fn from(scene: Scene) -> Self {
        Self {
            bit_length: scene.octree.bit_length(),
            octree: NodeSource::from(scene.octree.root().clone()),
            materials: scene.materials,
            camera: scene.camera,
            settings: scene.settings,
        }
    }
}

impl Scene {
    /// Scene with default render settings.
    pub fn new(octree: Octree, materials: MaterialTable, camera: Camera) -> Self {
        Self {
            octree,
            materials,
            camera,
            settings: RenderSettings::default(),
        }
    }

    /// Replace the render settings.
    pub fn with_settings(mut self, settings: RenderSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Parse a scene document.
    pub fn from_json(json: &str) -> Result<Self> {
        let doc: SceneDocument = serde_json::from_str(json)?;
        let scene = Scene::try_from(doc)?;
        log::debug!(
            "loaded scene: L={}, {} materials, {}x{} image",
            scene.octree.bit_length(),
            scene.materials.len(),
            scene.camera.image_width,
            scene.camera.image_height
        );
        Ok(scene)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Render the full frame.
    pub fn render(&self) -> Result<Raster> {
        render_frame(&self.octree, &self.camera, &self.materials, &self.settings)
    }

    /// Trace a single pixel.
    pub fn trace_pixel(&self, x: u32, y: u32) -> Result<Trace> {
        trace_pixel(&self.octree, &self.camera, x, y, &self.settings)
    }

    /// A 4x4x4 world with one white cube in the far top-right corner,
    /// viewed head-on with flat shading.
    pub fn demo_corner() -> Result<Self> {
        let octree = Octree::new(OctreeNode::from_leaves([0, 0, 0, 0, 0, 0, 0, 1]), 2)?;
        let camera = Camera::new(
            Vec3::new(3.0, 3.0, 0.0),
            Vec3::new(0.0, 0.0, 10.0),
            Vec3::y(),
            Vec3::x(),
            128,
            72,
        );
        let materials = MaterialTable::new(vec![[0, 0, 0], [255, 255, 255]]);
        Ok(Self::new(octree, materials, camera).with_settings(RenderSettings::flat()))
    }

    /// A 1024-wide world with three coloured half-size cubes, lit.
    pub fn demo_shaded() -> Result<Self> {
        let octree = Octree::new(OctreeNode::from_leaves([0, 0, 0, 0, 0, 2, 3, 1]), 10)?;
        let camera = Camera::new(
            Vec3::new(200.0, 300.0, 0.0),
            Vec3::new(0.0, 0.0, 230.0),
            Vec3::y(),
            Vec3::x(),
            640,
            480,
        );
        Ok(Self::new(octree, MaterialTable::basic(), camera))
    }
}
