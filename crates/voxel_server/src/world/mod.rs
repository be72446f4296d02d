//! The shared voxel world.
//!
//! A single [`WorldGrid`] lives for the whole process. It is mutated only by
//! the session protocol handler while it holds the relay lock, and copied
//! into a [`WorldSnapshot`] for every newly connected session.

pub mod color;
pub mod grid;
pub mod snapshot;

pub use color::Color;
pub use grid::{Voxel, VoxelPos, WorldDimensions, WorldGrid, FLOOR_LAYER, MAX_VOXELS};
pub use snapshot::WorldSnapshot;
