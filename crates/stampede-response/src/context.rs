//! Per-call evaluation context.

use stampede_core::query::{NoNeighbors, OpenWorld, SpatialQuery, WorldQuery};

/// Everything outside the agent that an evaluation may read.
#[derive(Clone, Copy)]
pub struct Environment<'a> {
    /// Current simulation tick.
    pub tick: u64,
    pub neighbors: &'a dyn SpatialQuery,
    pub world: &'a dyn WorldQuery,
}

impl<'a> Environment<'a> {
    pub fn new(tick: u64, neighbors: &'a dyn SpatialQuery, world: &'a dyn WorldQuery) -> Self {
        Self {
            tick,
            neighbors,
            world,
        }
    }

    /// Environment with no neighbours and open terrain.
    pub fn empty(tick: u64) -> Environment<'static> {
        Environment {
            tick,
            neighbors: &NoNeighbors,
            world: &OpenWorld,
        }
    }
}
