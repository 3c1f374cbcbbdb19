//! Population snapshot: the diagnostic view emitted after each tick.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::enums::EscapeStrategy;
use crate::events::CueEvent;
use crate::types::{AgentId, SimTime, SpeciesId};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PopulationSnapshot {
    pub time: SimTime,
    /// Sorted by agent id.
    pub agents: Vec<AgentSnapshot>,
    /// Cues fired during the tick.
    pub cues: Vec<CueEvent>,
}

impl PopulationSnapshot {
    pub fn agent(&self, id: AgentId) -> Option<&AgentSnapshot> {
        self.agents
            .binary_search_by_key(&id, |a| a.id)
            .ok()
            .map(|i| &self.agents[i])
    }

    pub fn panicking_count(&self) -> usize {
        self.agents.iter().filter(|a| a.panicking).count()
    }
}

/// One agent's threat-response state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub species: SpeciesId,
    pub position: DVec3,
    pub velocity: DVec3,
    pub intent: DVec3,
    pub strategy: EscapeStrategy,
    pub frozen: bool,
    pub panicking: bool,
    pub fleeing: bool,
    pub panic_intensity: f64,
    pub habituation: f64,
    pub last_threat: Option<AgentId>,
    pub alarms_raised: u32,
    pub herd_alerted: u32,
}
