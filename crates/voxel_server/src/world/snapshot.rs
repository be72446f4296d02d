//! Wire form of the full world sent to connecting sessions.

use super::grid::{Voxel, WorldDimensions};
use serde::ser::{Serialize, SerializeSeq, Serializer};

/// Owned copy of the grid contents.
///
/// Serializes as nested sequences indexed `[x][z][y]`, each leaf being a
/// color integer or `null`.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldSnapshot {
    dimensions: WorldDimensions,
    voxels: Vec<Voxel>,
}

impl WorldSnapshot {
    pub(crate) fn new(dimensions: WorldDimensions, voxels: Vec<Voxel>) -> Self {
        debug_assert_eq!(voxels.len(), dimensions.volume());
        Self { dimensions, voxels }
    }

    pub fn dimensions(&self) -> WorldDimensions {
        self.dimensions
    }

    /// The vertical column at `(x, z)`, bottom first.
    pub fn column(&self, x: usize, z: usize) -> &[Voxel] {
        let height = self.dimensions.height;
        let start = (x * self.dimensions.depth + z) * height;
        &self.voxels[start..start + height]
    }
}

struct Slice<'a> {
    snapshot: &'a WorldSnapshot,
    x: usize,
}

impl Serialize for Slice<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let depth = self.snapshot.dimensions.depth;
        let mut seq = serializer.serialize_seq(Some(depth))?;
        for z in 0..depth {
            seq.serialize_element(self.snapshot.column(self.x, z))?;
        }
        seq.end()
    }
}

impl Serialize for WorldSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let width = self.dimensions.width;
        let mut seq = serializer.serialize_seq(Some(width))?;
        for x in 0..width {
            seq.serialize_element(&Slice { snapshot: self, x })?;
        }
        seq.end()
    }
}
