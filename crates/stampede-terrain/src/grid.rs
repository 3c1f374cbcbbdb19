//! VoxelGrid: block storage with light levels.

use glam::{DVec3, IVec3};
use stampede_core::constants::MAX_LIGHT_LEVEL;

/// What occupies one cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Block {
    #[default]
    Air,
    /// Obstructs movement and sight.
    Solid,
    /// Open water. Passable; predators rarely follow.
    Water,
    /// Dense cover (tall grass, shrubs). Passable.
    Foliage,
}

impl Block {
    pub fn is_solid(self) -> bool {
        self == Block::Solid
    }
}

/// Grid extent in block coordinates.
#[derive(Debug, Clone, Copy)]
pub struct GridHeader {
    /// Minimum corner (inclusive).
    pub origin: IVec3,
    /// Number of cells along x.
    pub width: u32,
    /// Number of cells along y (vertical).
    pub height: u32,
    /// Number of cells along z.
    pub depth: u32,
}

impl GridHeader {
    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize * self.depth as usize
    }

    /// Maximum corner (exclusive).
    pub fn end(&self) -> IVec3 {
        self.origin + IVec3::new(self.width as i32, self.height as i32, self.depth as i32)
    }

    pub fn contains(&self, cell: IVec3) -> bool {
        let end = self.end();
        cell.cmpge(self.origin).all() && cell.cmplt(end).all()
    }
}

/// Dense voxel grid. Cells outside the grid read as open sky.
#[derive(Debug, Clone)]
pub struct VoxelGrid {
    pub header: GridHeader,
    /// Row-major: x fastest, then z, then y.
    blocks: Vec<Block>,
    /// Light level per cell, 0..=15.
    light: Vec<u8>,
}

impl VoxelGrid {
    /// All-air grid at full light.
    pub fn new(header: GridHeader) -> Self {
        let cells = header.cell_count();
        Self {
            header,
            blocks: vec![Block::Air; cells],
            light: vec![MAX_LIGHT_LEVEL; cells],
        }
    }

    /// Grid with a solid floor filling every layer below `ground_y`.
    pub fn flat(header: GridHeader, ground_y: i32) -> Self {
        let mut grid = Self::new(header);
        let min = header.origin;
        let max = IVec3::new(header.end().x - 1, ground_y - 1, header.end().z - 1);
        grid.fill(min, max, Block::Solid);
        grid
    }

    /// Block cell containing a world position.
    pub fn cell_of(position: DVec3) -> IVec3 {
        position.floor().as_ivec3()
    }

    /// World position of a cell's centre.
    pub fn cell_center(cell: IVec3) -> DVec3 {
        cell.as_dvec3() + DVec3::splat(0.5)
    }

    fn index(&self, cell: IVec3) -> Option<usize> {
        if !self.header.contains(cell) {
            return None;
        }
        let local = (cell - self.header.origin).as_uvec3();
        let w = self.header.width as usize;
        let d = self.header.depth as usize;
        Some(local.x as usize + local.z as usize * w + local.y as usize * w * d)
    }

    pub fn block(&self, cell: IVec3) -> Block {
        self.index(cell).map_or(Block::Air, |i| self.blocks[i])
    }

    /// Set one block. Returns false when the cell is outside the grid.
    pub fn set_block(&mut self, cell: IVec3, block: Block) -> bool {
        match self.index(cell) {
            Some(i) => {
                self.blocks[i] = block;
                true
            }
            None => false,
        }
    }

    /// Fill an inclusive box, clipped to the grid.
    pub fn fill(&mut self, min: IVec3, max: IVec3, block: Block) {
        let lo = min.max(self.header.origin);
        let hi = max.min(self.header.end() - IVec3::ONE);
        for y in lo.y..=hi.y {
            for z in lo.z..=hi.z {
                for x in lo.x..=hi.x {
                    self.set_block(IVec3::new(x, y, z), block);
                }
            }
        }
    }

    pub fn light(&self, cell: IVec3) -> u8 {
        self.index(cell).map_or(MAX_LIGHT_LEVEL, |i| self.light[i])
    }

    /// Set the light level of every cell, clamped to 0..=15.
    pub fn set_uniform_light(&mut self, level: u8) {
        self.light.fill(level.min(MAX_LIGHT_LEVEL));
    }

    /// Set light in an inclusive box, clipped to the grid.
    pub fn fill_light(&mut self, min: IVec3, max: IVec3, level: u8) {
        let level = level.min(MAX_LIGHT_LEVEL);
        let lo = min.max(self.header.origin);
        let hi = max.min(self.header.end() - IVec3::ONE);
        for y in lo.y..=hi.y {
            for z in lo.z..=hi.z {
                for x in lo.x..=hi.x {
                    if let Some(i) = self.index(IVec3::new(x, y, z)) {
                        self.light[i] = level;
                    }
                }
            }
        }
    }
}
