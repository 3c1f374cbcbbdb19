//! `WorldQuery` over a voxel grid.

use glam::DVec3;
use stampede_core::query::WorldQuery;

use crate::grid::VoxelGrid;
use crate::refuge;

impl WorldQuery for VoxelGrid {
    fn is_solid(&self, position: DVec3) -> bool {
        self.block(Self::cell_of(position)).is_solid()
    }

    fn is_refuge(&self, position: DVec3) -> bool {
        refuge::is_refuge_cell(self, Self::cell_of(position))
    }

    fn nearest_refuge(&self, center: DVec3, range: f64) -> Option<DVec3> {
        refuge::nearest_refuge(self, center, range)
    }

    fn light_level(&self, position: DVec3) -> u8 {
        self.light(Self::cell_of(position))
    }
}

#[cfg(test)]
mod tests {
    use glam::IVec3;

    use super::*;
    use crate::grid::{Block, GridHeader};

    #[test]
    fn test_world_query_reads_grid() {
        let mut grid = VoxelGrid::flat(
            GridHeader {
                origin: IVec3::new(0, 0, 0),
                width: 8,
                height: 4,
                depth: 8,
            },
            1,
        );
        grid.set_block(IVec3::new(2, 1, 2), Block::Solid);
        grid.set_block(IVec3::new(5, 1, 5), Block::Water);
        grid.fill_light(IVec3::new(0, 1, 0), IVec3::new(7, 1, 0), 3);

        let world: &dyn WorldQuery = &grid;
        assert!(world.is_solid(DVec3::new(2.7, 1.1, 2.2)));
        assert!(world.is_solid(DVec3::new(4.0, 0.5, 4.0)));
        assert!(!world.is_solid(DVec3::new(4.0, 1.5, 4.0)));
        assert!(world.is_refuge(DVec3::new(5.5, 1.5, 5.5)));
        assert!(world.is_refuge(DVec3::new(3.5, 1.5, 0.5)));
        assert_eq!(world.light_level(DVec3::new(3.5, 1.5, 0.5)), 3);
        assert_eq!(world.light_level(DVec3::new(3.5, 1.5, 3.5)), 15);
        assert_eq!(
            world.nearest_refuge(DVec3::new(5.5, 1.0, 3.5), 4.0),
            Some(DVec3::new(5.5, 1.5, 5.5))
        );
    }
}
