//! Bounds-checked voxel storage.
//!
//! The grid is a dense `width × depth × height` array of optional colors. All
//! access goes through [`VoxelPos`], which only [`WorldGrid::locate`] can
//! produce, so a position that reaches [`WorldGrid::get`] or
//! [`WorldGrid::set`] is always inside the grid it was located in.

use super::color::Color;
use super::snapshot::WorldSnapshot;
use crate::config::WorldConfig;
use serde::Serialize;

/// Contents of a single voxel: empty or a solid color.
pub type Voxel = Option<Color>;

/// The layer that can never be built on or broken.
pub const FLOOR_LAYER: usize = 0;

/// Extent of the grid along each axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorldDimensions {
    pub width: usize,
    pub depth: usize,
    pub height: usize,
}

/// Upper bound on the number of voxels a grid may hold.
pub const MAX_VOXELS: usize = 1 << 26;

impl WorldDimensions {
    /// Total number of voxels.
    ///
    /// Assumes dimensions already checked with [`WorldDimensions::checked_volume`].
    pub fn volume(&self) -> usize {
        self.width * self.depth * self.height
    }

    /// Total number of voxels, or `None` if the product overflows `usize`.
    pub fn checked_volume(&self) -> Option<usize> {
        self.width.checked_mul(self.depth)?.checked_mul(self.height)
    }
}

/// A validated voxel coordinate.
///
/// Fields are private: the only constructor is [`WorldGrid::locate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoxelPos {
    x: usize,
    y: usize,
    z: usize,
}

impl VoxelPos {
    pub fn x(&self) -> usize {
        self.x
    }

    pub fn y(&self) -> usize {
        self.y
    }

    pub fn z(&self) -> usize {
        self.z
    }
}

/// The shared block world.
#[derive(Debug, Clone)]
pub struct WorldGrid {
    dimensions: WorldDimensions,
    /// Indexed `[x][z][y]`, y innermost, matching the snapshot wire order.
    voxels: Vec<Voxel>,
}

impl WorldGrid {
    /// Builds a grid with the configured dimensions and fills the bottom
    /// layers from the floor palette, one color per layer.
    ///
    /// Palette entries beyond the grid height are ignored.
    pub fn new(config: &WorldConfig) -> Self {
        let dimensions = WorldDimensions {
            width: config.width,
            depth: config.depth,
            height: config.height,
        };
        let mut voxels = vec![None; dimensions.volume()];

        if dimensions.height > 0 {
            for column in voxels.chunks_mut(dimensions.height) {
                for (y, color) in config.floor_palette.iter().enumerate().take(dimensions.height) {
                    column[y] = Some(*color);
                }
            }
        }

        Self { dimensions, voxels }
    }

    pub fn dimensions(&self) -> WorldDimensions {
        self.dimensions
    }

    /// Returns true if the wire coordinates name a voxel inside the grid.
    ///
    /// Fails closed for anything that is not a finite, non-negative integer
    /// below the axis length.
    pub fn within_bounds(&self, x: f64, y: f64, z: f64) -> bool {
        self.locate(x, y, z).is_some()
    }

    /// Converts wire coordinates into a checked [`VoxelPos`].
    pub fn locate(&self, x: f64, y: f64, z: f64) -> Option<VoxelPos> {
        Some(VoxelPos {
            x: axis_index(x, self.dimensions.width)?,
            y: axis_index(y, self.dimensions.height)?,
            z: axis_index(z, self.dimensions.depth)?,
        })
    }

    pub fn get(&self, pos: VoxelPos) -> Voxel {
        self.voxels[self.index(pos)]
    }

    pub fn set(&mut self, pos: VoxelPos, voxel: Voxel) {
        let index = self.index(pos);
        self.voxels[index] = voxel;
    }

    /// Floor voxels are immutable for clients.
    pub fn is_protected(&self, pos: VoxelPos) -> bool {
        pos.y == FLOOR_LAYER
    }

    /// Number of non-empty voxels.
    pub fn count_filled(&self) -> usize {
        self.voxels.iter().filter(|voxel| voxel.is_some()).count()
    }

    /// Owned copy of the grid for the initial sync of a new session.
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot::new(self.dimensions, self.voxels.clone())
    }

    fn index(&self, pos: VoxelPos) -> usize {
        (pos.x * self.dimensions.depth + pos.z) * self.dimensions.height + pos.y
    }
}

fn axis_index(value: f64, len: usize) -> Option<usize> {
    if !value.is_finite() || value.fract() != 0.0 || value < 0.0 || value >= len as f64 {
        return None;
    }
    Some(value as usize)
}
