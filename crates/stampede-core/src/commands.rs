//! Harness commands sent to the simulation.
//!
//! Commands are queued and applied at the next tick boundary.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::types::AgentId;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HarnessCommand {
    // --- State resets ---
    /// Clear one agent's escape, panic and alarm state.
    ResetAgent { agent: AgentId },
    /// Clear every agent's state.
    ResetAll,

    // --- Encounter outcomes ---
    /// Apply damage. Resets habituation.
    Damage { agent: AgentId, amount: f64 },
    /// Record a non-lethal encounter. Raises habituation.
    NonLethalEncounter { agent: AgentId },

    // --- Direct control ---
    /// Start a stampede, optionally fleeing away from a position.
    ForcePanic {
        agent: AgentId,
        away_from: Option<DVec3>,
    },
    ForceEndPanic { agent: AgentId },
    /// Raise an alarm about `threat`, bypassing distance gating.
    ForceAlarm { agent: AgentId, threat: AgentId },
    SetFacing { agent: AgentId, facing: DVec3 },
    Despawn { agent: AgentId },
}
