//! Pinhole camera and per-pixel ray generation.

use std::fmt;
use std::str::FromStr;

use octrace_math::{is_finite, normalize_or_zero, to_lattice, IVec3, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{KernelError, Result};
use crate::ray::Ray;

/// Camera snapshot for one frame.
///
/// The basis vectors are not required to be orthonormal: `forward` is the
/// image-plane offset (its length sets the field of view) and `right`/`up`
/// are the per-pixel steps across the plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Eye position in world space.
    pub position: Vec3,
    /// Vector from the eye to the image-plane centre.
    pub forward: Vec3,
    /// One pixel step up the image.
    pub up: Vec3,
    /// One pixel step right across the image.
    pub right: Vec3,
    /// Image width in pixels.
    pub image_width: u32,
    /// Image height in pixels.
    pub image_height: u32,
}

impl Camera {
    /// Create a camera.
    pub fn new(
        position: Vec3,
        forward: Vec3,
        up: Vec3,
        right: Vec3,
        image_width: u32,
        image_height: u32,
    ) -> Self {
        Self {
            position,
            forward,
            up,
            right,
            image_width,
            image_height,
        }
    }

    /// Camera at `position` oriented by an axis preset.
    pub fn from_preset(
        preset: CameraPreset,
        position: Vec3,
        image_width: u32,
        image_height: u32,
    ) -> Self {
        let (forward, right, up) = preset.basis();
        Self::new(position, forward, up, right, image_width, image_height)
    }

    /// Check that the camera can produce rays.
    pub fn validate(&self) -> Result<()> {
        if self.image_width == 0 || self.image_height == 0 {
            return Err(KernelError::InvalidCamera(format!(
                "image size {}x{} has no pixels",
                self.image_width, self.image_height
            )));
        }
        for (name, v) in [
            ("position", &self.position),
            ("forward", &self.forward),
            ("up", &self.up),
            ("right", &self.right),
        ] {
            if !is_finite(v) {
                return Err(KernelError::InvalidCamera(format!("{name} is not finite")));
            }
        }
        if self.forward.norm() == 0.0 {
            return Err(KernelError::InvalidCamera("forward vector is zero".into()));
        }
        Ok(())
    }

    /// Lattice point every ray of this camera starts from.
    pub fn origin(&self) -> IVec3 {
        to_lattice(&self.position)
    }

    /// Ray through pixel `(px, py)`, with `(0, 0)` at the top-left.
    ///
    /// Rows grow downwards on screen but upwards in view space, hence the
    /// flipped vertical offset.
    pub fn generate_ray(&self, px: u32, py: u32) -> Ray {
        let centered_x = px as f64 - self.image_width as f64 / 2.0;
        let centered_y = self.image_height as f64 / 2.0 - py as f64;
        let direction = self.right * centered_x + self.up * centered_y + self.forward;
        Ray::new(self.origin(), normalize_or_zero(&direction))
    }
}

/// Axis-aligned camera orientations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraPreset {
    /// Looking along +Z.
    #[serde(rename = "+z")]
    PositiveZ,
    /// Looking along -Z.
    #[serde(rename = "-z")]
    NegativeZ,
    /// Looking along +Y.
    #[serde(rename = "+y")]
    PositiveY,
    /// Looking along -Y.
    #[serde(rename = "-y")]
    NegativeY,
    /// Looking along +X.
    #[serde(rename = "+x")]
    PositiveX,
    /// Looking along -X.
    #[serde(rename = "-x")]
    NegativeX,
}

impl CameraPreset {
    /// All presets.
    pub const ALL: [CameraPreset; 6] = [
        CameraPreset::PositiveZ,
        CameraPreset::NegativeZ,
        CameraPreset::PositiveY,
        CameraPreset::NegativeY,
        CameraPreset::PositiveX,
        CameraPreset::NegativeX,
    ];

    /// `(forward, right, up)` for this preset.
    pub fn basis(self) -> (Vec3, Vec3, Vec3) {
        match self {
            CameraPreset::PositiveZ => (
                Vec3::new(0.0, 0.0, 100.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ),
            CameraPreset::NegativeZ => (
                Vec3::new(0.0, 0.0, -100.0),
                Vec3::new(-1.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ),
            CameraPreset::PositiveY => (
                Vec3::new(0.0, 1.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 0.0, -1.0),
            ),
            CameraPreset::NegativeY => (
                Vec3::new(0.0, -100.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.0, 0.0, 1.0),
            ),
            CameraPreset::PositiveX => (
                Vec3::new(100.0, 0.0, 0.0),
                Vec3::new(0.0, 0.0, -1.0),
                Vec3::new(0.0, 1.0, 0.0),
            ),
            CameraPreset::NegativeX => (
                Vec3::new(-100.0, 0.0, 0.0),
                Vec3::new(0.0, 0.0, 1.0),
                Vec3::new(0.0, 1.0, 0.0),
            ),
        }
    }

    /// Default eye position for this preset in an `L = bit_length` world.
    ///
    /// The -Z view sits behind the far face; every other preset starts on
    /// the near z plane. Coordinates are laid out for a 1024 world and scaled
    /// by `2^L / 1024`.
    pub fn position(self, bit_length: u32) -> Vec3 {
        let base = match self {
            CameraPreset::NegativeZ => Vec3::new(250.0, 512.0, 760.0),
            _ => Vec3::new(250.0, 512.0, 0.0),
        };
        base * ((1u64 << bit_length) as f64 / 1024.0)
    }

    /// Short name, e.g. `+z`.
    pub fn name(self) -> &'static str {
        match self {
            CameraPreset::PositiveZ => "+z",
            CameraPreset::NegativeZ => "-z",
            CameraPreset::PositiveY => "+y",
            CameraPreset::NegativeY => "-y",
            CameraPreset::PositiveX => "+x",
            CameraPreset::NegativeX => "-x",
        }
    }
}

impl fmt::Display for CameraPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CameraPreset {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        CameraPreset::ALL
            .into_iter()
            .find(|p| p.name() == lower)
            .ok_or_else(|| KernelError::InvalidCamera(format!("unknown preset '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn corner_camera() -> Camera {
        Camera::new(
            Vec3::new(3.0, 3.0, 0.0),
            Vec3::new(0.0, 0.0, 10.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            128,
            72,
        )
    }

    #[test]
    fn test_center_pixel_looks_forward() {
        let ray = corner_camera().generate_ray(64, 36);
        assert_eq!(ray.origin, IVec3::new(3, 3, 0));
        assert_relative_eq!(ray.direction, Vec3::z(), epsilon = 1e-12);
    }

    #[test]
    fn test_vertical_flip() {
        let cam = corner_camera();
        let top = cam.generate_ray(64, 0);
        let bottom = cam.generate_ray(64, 71);
        assert!(top.direction.y > 0.0);
        assert!(bottom.direction.y < 0.0);
    }

    #[test]
    fn test_direction_is_unit() {
        let cam = corner_camera();
        for (x, y) in [(0, 0), (127, 71), (10, 50)] {
            assert_relative_eq!(cam.generate_ray(x, y).direction.norm(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_direction_matches_formula() {
        let cam = corner_camera();
        let ray = cam.generate_ray(0, 0);
        let expected = Vec3::new(-64.0, 36.0, 10.0).normalize();
        assert_relative_eq!(ray.direction, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_odd_width_centres_on_half_pixel() {
        let mut cam = corner_camera();
        cam.image_width = 3;
        cam.image_height = 3;
        // centred_x = 1 - 1.5 = -0.5
        let ray = cam.generate_ray(1, 1);
        let expected = Vec3::new(-0.5, 0.5, 10.0).normalize();
        assert_relative_eq!(ray.direction, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_origin_rounds_half_even() {
        let mut cam = corner_camera();
        cam.position = Vec3::new(2.5, 3.5, 0.49);
        assert_eq!(cam.origin(), IVec3::new(2, 4, 0));
    }

    #[test]
    fn test_validate() {
        assert!(corner_camera().validate().is_ok());
        let mut cam = corner_camera();
        cam.image_width = 0;
        assert!(cam.validate().is_err());
        let mut cam = corner_camera();
        cam.forward = Vec3::zeros();
        assert!(cam.validate().is_err());
        let mut cam = corner_camera();
        cam.up = Vec3::new(f64::NAN, 0.0, 0.0);
        assert!(cam.validate().is_err());
    }

    #[test]
    fn test_preset_parse_and_basis() {
        let preset: CameraPreset = "-X".parse().unwrap();
        assert_eq!(preset, CameraPreset::NegativeX);
        let (forward, right, up) = preset.basis();
        assert_eq!(forward, Vec3::new(-100.0, 0.0, 0.0));
        assert_eq!(right, Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(up, Vec3::y());
        assert!("sideways".parse::<CameraPreset>().is_err());
        for p in CameraPreset::ALL {
            assert_eq!(p.to_string().parse::<CameraPreset>().unwrap(), p);
        }
    }

    #[test]
    fn test_preset_positions_scale_with_world() {
        assert_eq!(
            CameraPreset::NegativeZ.position(10),
            Vec3::new(250.0, 512.0, 760.0)
        );
        assert_eq!(
            CameraPreset::PositiveX.position(10),
            Vec3::new(250.0, 512.0, 0.0)
        );
        assert_eq!(
            CameraPreset::NegativeZ.position(11),
            Vec3::new(500.0, 1024.0, 1520.0)
        );
        assert_relative_eq!(
            CameraPreset::PositiveY.position(2),
            Vec3::new(250.0 / 256.0, 2.0, 0.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_camera_json_shape() {
        let json = serde_json::to_string(&corner_camera()).unwrap();
        assert!(json.contains("\"position\":[3.0,3.0,0.0]"), "{json}");
        let back: Camera = serde_json::from_str(&json).unwrap();
        assert_eq!(back, corner_camera());
    }
}
