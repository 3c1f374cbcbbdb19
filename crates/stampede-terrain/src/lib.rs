//! Terrain for STAMPEDE.
//!
//! Voxel block grid with per-cell light, refuge classification and the
//! nearest-refuge scan used by the threat-response core.

pub use stampede_core as core;

pub mod grid;
pub mod refuge;
pub mod world;

// Re-export key types for convenience.
pub use grid::{Block, GridHeader, VoxelGrid};
pub use refuge::{is_refuge_cell, nearest_refuge};
