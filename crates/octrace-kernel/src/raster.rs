//! Row-major RGB frame buffer.

use crate::error::{KernelError, Result};
use crate::material::Rgb;

/// Dense RGB raster, origin top-left, 3 bytes per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

/// Pixel-level difference between two rasters of equal size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterDiff {
    /// Number of pixels whose colour differs.
    pub differing: usize,
    /// Total pixels compared.
    pub total: usize,
    /// First differing pixel in scan order.
    pub first: Option<[u32; 2]>,
}

impl RasterDiff {
    /// True if the rasters are identical.
    pub fn is_identical(&self) -> bool {
        self.differing == 0
    }
}

impl Raster {
    /// Raster filled with `fill`.
    pub fn new(width: u32, height: u32, fill: Rgb) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * 3);
        for _ in 0..pixels {
            data.extend_from_slice(&fill);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Wrap existing row-major RGB bytes.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(KernelError::RasterSize(format!(
                "{}x{} needs {expected} bytes, got {}",
                width,
                height,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) outside {}x{} raster",
            self.width,
            self.height
        );
        (y as usize * self.width as usize + x as usize) * 3
    }

    /// Colour at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` lies outside the raster.
    pub fn pixel(&self, x: u32, y: u32) -> Rgb {
        let i = self.offset(x, y);
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Set the colour at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` lies outside the raster.
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgb) {
        let i = self.offset(x, y);
        self.data[i..i + 3].copy_from_slice(&color);
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume into raw bytes.
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Compare against another raster of the same size.
    pub fn diff(&self, other: &Raster) -> Result<RasterDiff> {
        if self.width != other.width || self.height != other.height {
            return Err(KernelError::RasterSize(format!(
                "cannot compare {}x{} with {}x{}",
                self.width, self.height, other.width, other.height
            )));
        }

        let mut differing = 0;
        let mut first = None;
        for (i, (a, b)) in self
            .data
            .chunks_exact(3)
            .zip(other.data.chunks_exact(3))
            .enumerate()
        {
            if a != b {
                differing += 1;
                if first.is_none() {
                    let w = self.width as usize;
                    first = Some([(i % w) as u32, (i / w) as u32]);
                }
            }
        }

        Ok(RasterDiff {
            differing,
            total: self.data.len() / 3,
            first,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_major_layout() {
        let mut r = Raster::new(3, 2, [0, 0, 0]);
        r.set_pixel(2, 1, [1, 2, 3]);
        assert_eq!(r.pixel(2, 1), [1, 2, 3]);
        assert_eq!(&r.as_bytes()[15..18], &[1, 2, 3]);
        assert_eq!(r.as_bytes().len(), 18);
    }

    #[test]
    #[should_panic(expected = "outside 3x2 raster")]
    fn test_pixel_out_of_bounds_panics() {
        Raster::new(3, 2, [0, 0, 0]).pixel(3, 0);
    }

    #[test]
    #[should_panic(expected = "outside 3x2 raster")]
    fn test_set_pixel_out_of_bounds_panics() {
        Raster::new(3, 2, [0, 0, 0]).set_pixel(0, 2, [1, 1, 1]);
    }

    #[test]
    fn test_from_raw_checks_length() {
        assert!(Raster::from_raw(2, 2, vec![0; 12]).is_ok());
        assert!(Raster::from_raw(2, 2, vec![0; 11]).is_err());
    }

    #[test]
    fn test_diff_counts_pixels() {
        let a = Raster::new(4, 4, [10, 10, 10]);
        let mut b = a.clone();
        assert!(a.diff(&b).unwrap().is_identical());

        b.set_pixel(1, 2, [10, 10, 11]);
        b.set_pixel(3, 3, [0, 0, 0]);
        let d = a.diff(&b).unwrap();
        assert_eq!(d.differing, 2);
        assert_eq!(d.total, 16);
        assert_eq!(d.first, Some([1, 2]));
    }

    #[test]
    fn test_diff_rejects_size_mismatch() {
        let a = Raster::new(4, 4, [0; 3]);
        let b = Raster::new(4, 3, [0; 3]);
        assert!(matches!(a.diff(&b), Err(KernelError::RasterSize(_))));
    }
}
