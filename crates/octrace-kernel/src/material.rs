//! Material palette.

use serde::{Deserialize, Serialize};

use crate::error::{KernelError, Result};
use crate::octree::MaterialId;

/// 8-bit RGB colour.
pub type Rgb = [u8; 3];

/// Black, used for empty space and as the default background.
pub const BLACK: Rgb = [0, 0, 0];

/// Ordered palette indexed by material id. Entry 0 stands for "no material".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialTable(Vec<Rgb>);

/// What to do when a hit material has no palette entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingMaterial {
    /// Abort the frame with [`KernelError::MaterialLookup`].
    #[default]
    Fail,
    /// Use this colour instead and log a warning.
    Substitute(Rgb),
}

impl MaterialTable {
    /// Create a table from its colours; index 0 is conventionally black.
    pub fn new(colors: Vec<Rgb>) -> Self {
        Self(colors)
    }

    /// Black, white, green, blue, red, yellow.
    pub fn basic() -> Self {
        Self(vec![
            BLACK,
            [255, 255, 255],
            [0, 255, 0],
            [0, 0, 255],
            [255, 0, 0],
            [255, 255, 0],
        ])
    }

    /// Number of entries, including entry 0.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Colour of `material`.
    pub fn get(&self, material: MaterialId) -> Result<Rgb> {
        self.0
            .get(material as usize)
            .copied()
            .ok_or(KernelError::MaterialLookup {
                material,
                table_len: self.0.len(),
            })
    }

    /// Colour of `material`, applying `policy` when it is missing.
    pub fn resolve(&self, material: MaterialId, policy: MissingMaterial) -> Result<Rgb> {
        match (self.get(material), policy) {
            (Ok(color), _) => Ok(color),
            (Err(err), MissingMaterial::Fail) => Err(err),
            (Err(err), MissingMaterial::Substitute(color)) => {
                log::warn!("{err}; substituting {color:?}");
                Ok(color)
            }
        }
    }
}

impl Default for MaterialTable {
    fn default() -> Self {
        Self::basic()
    }
}
