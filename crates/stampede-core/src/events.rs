//! Events emitted by the response core: cross-agent signals consumed by
//! the engine, and cosmetic cues for audio and particle feedback.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::enums::SignalKind;
use crate::types::AgentId;

/// A write to another agent's panic flags, buffered until every agent
/// in the step has been evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub source: AgentId,
    pub target: AgentId,
    pub kind: SignalKind,
    /// Where the sender believed the threat to be.
    pub threat_position: Option<DVec3>,
}

/// Cosmetic feedback triggers. Purely observational.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CueEvent {
    /// Vocal alarm call.
    AlarmCall { agent: AgentId, position: DVec3 },
    /// Visual alarm (tail flag, wing flash).
    VisualSignal { agent: AgentId, position: DVec3 },
    FleeStarted {
        agent: AgentId,
        threat: Option<AgentId>,
    },
    FreezeStarted { agent: AgentId, ticks: u32 },
    StampedeStarted { agent: AgentId, intensity: f64 },
    PanicEnded { agent: AgentId },
}
