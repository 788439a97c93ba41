#![warn(missing_docs)]

//! Integer-lattice ray tracing through a sparse voxel octree.
//!
//! This crate is the bit-exact software model of a hardware octree tracer.
//! Rays start on the integer lattice, decode their position to a leaf by
//! reading coordinate bits from the top down, and cross empty leaves with a
//! doubling/halving stepper instead of computing plane intersections.
//!
//! # Architecture
//!
//! - [`octree`] - Node tree, octant addressing and leaf descent
//! - [`stepper`] - Empty-space stepping to just outside a leaf box
//! - [`traverse`] - The per-ray descend/step loop
//! - [`shade`] - Face normals, head-light brightness and gamma
//! - [`render`] - Frame and single-pixel entry points
//! - [`packed`] - The flat 32-bit word image loaded into node ROM
//! - [`scene`] - JSON scene documents
//!
//! # Example
//!
//! ```
//! use octrace_kernel::Scene;
//!
//! let scene = Scene::demo_corner().unwrap();
//! let frame = scene.render().unwrap();
//! assert_eq!(frame.pixel(64, 36), [255, 255, 255]);
//! ```

mod aabb;
mod error;
mod ray;

pub mod camera;
pub mod material;
pub mod octree;
pub mod packed;
pub mod raster;
pub mod render;
pub mod scene;
pub mod shade;
pub mod stepper;
pub mod traverse;

pub use aabb::Aabb;
pub use camera::{Camera, CameraPreset};
pub use error::{KernelError, Result};
pub use material::{MaterialTable, MissingMaterial, Rgb};
pub use octree::{Descent, MaterialId, Octree, OctreeNode, OctreeStats, EMPTY};
pub use packed::PackedOctree;
pub use raster::{Raster, RasterDiff};
pub use ray::Ray;
pub use render::{render_frame, render_pixel, trace_pixel, RenderSettings};
pub use scene::Scene;
pub use shade::ShadingMode;
pub use stepper::{step, StepOutcome};
pub use traverse::{march, Hit, MarchLimits, Trace};
