//! Collaborator interfaces consumed by the response core.
//!
//! The host simulation owns the spatial index and the terrain. Both are
//! read-only from the core's perspective. When a collaborator is missing
//! (e.g. during teardown) the null implementations below answer every
//! query with an empty result so the core stays steppable.

use glam::DVec3;

use crate::constants::MAX_LIGHT_LEVEL;
use crate::types::AgentView;

/// Nearest-agents-within-radius query.
pub trait SpatialQuery {
    /// Agents whose position lies within `radius` of `center`, in any order.
    fn agents_within(&self, center: DVec3, radius: f64) -> Vec<AgentView>;
}

/// Terrain and world queries.
pub trait WorldQuery {
    /// Whether the block containing `position` obstructs movement.
    fn is_solid(&self, position: DVec3) -> bool;

    /// Whether the block containing `position` offers concealment or safety.
    fn is_refuge(&self, position: DVec3) -> bool;

    /// Nearest refuge within `range` of `center`, as a block-center position.
    fn nearest_refuge(&self, center: DVec3, range: f64) -> Option<DVec3>;

    /// Ambient light level at `position`, 0..=15.
    fn light_level(&self, position: DVec3) -> u8;
}

/// Spatial collaborator that sees nobody.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNeighbors;

impl SpatialQuery for NoNeighbors {
    fn agents_within(&self, _center: DVec3, _radius: f64) -> Vec<AgentView> {
        Vec::new()
    }
}

/// World collaborator with open, fully lit terrain and no refuges.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenWorld;

impl WorldQuery for OpenWorld {
    fn is_solid(&self, _position: DVec3) -> bool {
        false
    }

    fn is_refuge(&self, _position: DVec3) -> bool {
        false
    }

    fn nearest_refuge(&self, _center: DVec3, _range: f64) -> Option<DVec3> {
        None
    }

    fn light_level(&self, _position: DVec3) -> u8 {
        MAX_LIGHT_LEVEL
    }
}

/// Slice-backed spatial query: a linear scan, fine for tests and small herds.
impl SpatialQuery for [AgentView] {
    fn agents_within(&self, center: DVec3, radius: f64) -> Vec<AgentView> {
        let radius_sq = radius * radius;
        self.iter()
            .filter(|a| a.position.distance_squared(center) <= radius_sq)
            .copied()
            .collect()
    }
}

impl SpatialQuery for Vec<AgentView> {
    fn agents_within(&self, center: DVec3, radius: f64) -> Vec<AgentView> {
        self.as_slice().agents_within(center, radius)
    }
}
