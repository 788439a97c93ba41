//! Reading and writing rasters as image files.

use std::path::Path;

use anyhow::{Context, Result};
use octrace_kernel::Raster;

/// Write `raster` to `path`; the format follows the extension (`.png`, `.ppm`).
pub fn save(raster: &Raster, path: &Path) -> Result<()> {
    let img = image::RgbImage::from_raw(
        raster.width(),
        raster.height(),
        raster.as_bytes().to_vec(),
    )
    .ok_or_else(|| anyhow::anyhow!("raster buffer does not match its dimensions"))?;
    img.save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Load any supported image as an RGB raster.
pub fn load(path: &Path) -> Result<Raster> {
    let img = image::open(path)
        .with_context(|| format!("failed to read {}", path.display()))?
        .to_rgb8();
    let (width, height) = img.dimensions();
    Ok(Raster::from_raw(width, height, img.into_raw())?)
}
