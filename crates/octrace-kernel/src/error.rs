//! Error types for the tracing kernel.

use thiserror::Error;

/// Errors that can occur while building a scene or rendering a frame.
#[derive(Error, Debug)]
pub enum KernelError {
    /// The octree is malformed: wrong child count, depth beyond the
    /// configured bit length, or an unusable bit length.
    #[error("malformed octree: {0}")]
    Structural(String),

    /// The stepper or the march loop exceeded its iteration bound.
    #[error(
        "traversal diverged{} at position {position:?} with direction {direction:?} after {iterations} iterations",
        .pixel.map(|[x, y]| format!(" for pixel ({x}, {y})")).unwrap_or_default()
    )]
    TraversalDivergence {
        /// Pixel whose ray diverged, when known.
        pixel: Option<[u32; 2]>,
        /// Ray position when the bound was hit.
        position: [i64; 3],
        /// Ray direction when the bound was hit.
        direction: [f64; 3],
        /// Iterations spent before giving up.
        iterations: usize,
    },

    /// A hit material id has no entry in the material table.
    #[error("material {material} not present in a table of {table_len} entries")]
    MaterialLookup {
        /// Material id that was looked up.
        material: u32,
        /// Number of entries in the table.
        table_len: usize,
    },

    /// The camera cannot produce rays.
    #[error("invalid camera: {0}")]
    InvalidCamera(String),

    /// A packed octree word stream could not be decoded.
    #[error("invalid packed octree at word {index}: {reason}")]
    PackedImage {
        /// Word index where decoding failed.
        index: usize,
        /// Reason for failure.
        reason: String,
    },

    /// Raster dimensions disagree with its data or with another raster.
    #[error("raster size mismatch: {0}")]
    RasterSize(String),

    /// Scene document could not be parsed.
    #[error("scene JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl KernelError {
    /// Attach pixel coordinates to a divergence error; other errors pass through.
    pub fn at_pixel(self, x: u32, y: u32) -> Self {
        match self {
            KernelError::TraversalDivergence {
                position,
                direction,
                iterations,
                ..
            } => KernelError::TraversalDivergence {
                pixel: Some([x, y]),
                position,
                direction,
                iterations,
            },
            other => other,
        }
    }
}

/// Result type for kernel operations.
pub type Result<T> = std::result::Result<T, KernelError>;
