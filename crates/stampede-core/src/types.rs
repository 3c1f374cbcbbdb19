//! Fundamental identity, geometry, and simulation types.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::enums::Guild;

/// Stable agent identity. Never reused within one simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u64);

/// Dense species handle assigned once by the profile store at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpeciesId(pub u32);

/// Simulation time tracking.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SimTime {
    /// Current tick number (increments by 1 each tick).
    pub tick: u64,
}

impl SimTime {
    /// Advance by one tick.
    pub fn advance(&mut self) {
        self.tick += 1;
    }
}

/// Read-only view of one agent as seen by the response core.
///
/// Built by the host at the start of each step. Flags (`panicking`,
/// `fleeing`) reflect start-of-step state, so reads stay independent
/// of the order agents are processed in.
/// Axis convention: y is vertical.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentView {
    pub id: AgentId,
    pub species: SpeciesId,
    pub guild: Guild,
    pub position: DVec3,
    pub velocity: DVec3,
    /// Look direction (not necessarily normalized).
    pub facing: DVec3,
    pub health: f64,
    pub max_health: f64,
    pub juvenile: bool,
    /// Tick of the most recent damage taken, if any.
    pub last_damaged_tick: Option<u64>,
    /// Generic "aggressive" flag set by the host simulation.
    pub aggressive: bool,
    /// A human controller signalling passivity (sneaking).
    pub stealthy: bool,
    pub alive: bool,
    pub panicking: bool,
    pub fleeing: bool,
}

impl AgentView {
    /// Distance to another position.
    pub fn distance_to(&self, other: DVec3) -> f64 {
        self.position.distance(other)
    }

    /// Health as a fraction of max health. Zero max health reads as healthy.
    pub fn health_ratio(&self) -> f64 {
        if self.max_health > 0.0 {
            self.health / self.max_health
        } else {
            1.0
        }
    }

    pub fn speed(&self) -> f64 {
        self.velocity.length()
    }
}

/// Horizontal perpendicular (rotated +90° about the vertical axis).
pub fn horizontal_perpendicular(v: DVec3) -> DVec3 {
    DVec3::new(-v.z, 0.0, v.x)
}

/// Relative weights of the behaviours blended into the final steering intent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorWeights {
    pub escape: f64,
    pub stampede: f64,
}

impl Default for BehaviorWeights {
    fn default() -> Self {
        Self {
            escape: 1.0,
            stampede: 1.0,
        }
    }
}
