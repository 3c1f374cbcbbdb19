//! Uniform-grid spatial index over the start-of-step agent views.
//!
//! Rebuilt once per tick. Queries return agents sorted by id so that
//! evaluation stays deterministic whatever the bucket layout.

use std::collections::HashMap;

use glam::{DVec3, IVec3};
use thiserror::Error;

use stampede_core::query::SpatialQuery;
use stampede_core::types::{AgentId, AgentView};

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("spatial index cell size must be positive and finite, got {0}")]
    InvalidCellSize(f64),
}

/// Agents bucketed by grid cell.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    cell_size: f64,
    cells: HashMap<IVec3, Vec<usize>>,
    /// Sorted by id.
    agents: Vec<AgentView>,
}

impl SpatialIndex {
    pub fn new(cell_size: f64) -> Result<Self, IndexError> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(IndexError::InvalidCellSize(cell_size));
        }
        Ok(Self {
            cell_size,
            cells: HashMap::new(),
            agents: Vec::new(),
        })
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Replace the indexed population.
    pub fn rebuild(&mut self, mut agents: Vec<AgentView>) {
        agents.sort_by_key(|a| a.id);
        self.cells.clear();
        for (i, agent) in agents.iter().enumerate() {
            self.cells
                .entry(self.cell_of(agent.position))
                .or_default()
                .push(i);
        }
        self.agents = agents;
    }

    fn cell_of(&self, position: DVec3) -> IVec3 {
        (position / self.cell_size).floor().as_ivec3()
    }

    pub fn agents(&self) -> &[AgentView] {
        &self.agents
    }

    pub fn get(&self, id: AgentId) -> Option<&AgentView> {
        self.agents
            .binary_search_by_key(&id, |a| a.id)
            .ok()
            .map(|i| &self.agents[i])
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl SpatialQuery for SpatialIndex {
    fn agents_within(&self, center: DVec3, radius: f64) -> Vec<AgentView> {
        if radius.is_nan() || radius < 0.0 {
            return Vec::new();
        }
        let lo = self.cell_of(center - DVec3::splat(radius));
        let hi = self.cell_of(center + DVec3::splat(radius));
        let extent = hi.as_i64vec3() - lo.as_i64vec3() + 1;
        let box_cells = extent
            .x
            .saturating_mul(extent.y)
            .saturating_mul(extent.z);

        let mut found: Vec<usize> = Vec::new();
        if box_cells > self.cells.len() as i64 {
            // Query box larger than the occupied set: walk buckets instead.
            for (cell, members) in &self.cells {
                if cell.cmpge(lo).all() && cell.cmple(hi).all() {
                    found.extend_from_slice(members);
                }
            }
        } else {
            for y in lo.y..=hi.y {
                for z in lo.z..=hi.z {
                    for x in lo.x..=hi.x {
                        if let Some(members) = self.cells.get(&IVec3::new(x, y, z)) {
                            found.extend_from_slice(members);
                        }
                    }
                }
            }
        }
        found.sort_unstable();

        let radius_sq = radius * radius;
        found
            .into_iter()
            .map(|i| self.agents[i])
            .filter(|a| a.position.distance_squared(center) <= radius_sq)
            .collect()
    }
}
