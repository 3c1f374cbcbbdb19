//! Refuge classification and nearest-refuge search.
//!
//! A refuge is open water, dense foliage, or a dark walkable air cell
//! (a cave floor, the shade under a canopy). The search covers a box of
//! `range` horizontally and two blocks up and down, the band an animal
//! can reach without climbing.

use glam::{DVec3, I64Vec3, IVec3};
use stampede_core::constants::DARKNESS_LIGHT_LEVEL;

use crate::grid::{Block, VoxelGrid};

/// Vertical half-extent of the refuge search band.
pub const REFUGE_SEARCH_DY: i32 = 2;

/// Whether one cell offers concealment.
pub fn is_refuge_cell(grid: &VoxelGrid, cell: IVec3) -> bool {
    match grid.block(cell) {
        Block::Water | Block::Foliage => true,
        Block::Air => {
            grid.light(cell) < DARKNESS_LIGHT_LEVEL
                && grid.block(cell - IVec3::Y).is_solid()
        }
        Block::Solid => false,
    }
}

/// Nearest refuge cell centre within `range` of `center`.
///
/// Distance is measured between cell offsets; ties keep the first cell in
/// scan order (y, then z, then x ascending), so results are deterministic.
/// Only cells inside the grid are scanned: outside it everything is lit
/// open air.
pub fn nearest_refuge(grid: &VoxelGrid, center: DVec3, range: f64) -> Option<DVec3> {
    if range.is_nan() || range < 0.0 {
        return None;
    }
    let origin = center.floor().as_i64vec3();
    let r = range.ceil() as i64;
    let first = grid.header.origin;
    let last = grid.header.end() - IVec3::ONE;
    let (y0, y1) = clip(origin.y, i64::from(REFUGE_SEARCH_DY), first.y, last.y)?;
    let (z0, z1) = clip(origin.z, r, first.z, last.z)?;
    let (x0, x1) = clip(origin.x, r, first.x, last.x)?;
    let anchor = origin.as_dvec3();
    let range_sq = range * range;

    let mut best: Option<(f64, I64Vec3)> = None;
    for y in y0..=y1 {
        for z in z0..=z1 {
            for x in x0..=x1 {
                let cell = I64Vec3::new(x, y, z);
                let dist_sq = cell.as_dvec3().distance_squared(anchor);
                if dist_sq > range_sq {
                    continue;
                }
                if best.is_some_and(|(d, _)| dist_sq >= d) {
                    continue;
                }
                if is_refuge_cell(grid, cell.as_ivec3()) {
                    best = Some((dist_sq, cell));
                }
            }
        }
    }
    best.map(|(_, cell)| VoxelGrid::cell_center(cell.as_ivec3()))
}

/// `center ± reach` clipped to `lo..=hi`; `None` when they do not overlap.
fn clip(center: i64, reach: i64, lo: i32, hi: i32) -> Option<(i64, i64)> {
    let from = center.saturating_sub(reach).max(i64::from(lo));
    let to = center.saturating_add(reach).min(i64::from(hi));
    (from <= to).then_some((from, to))
}
