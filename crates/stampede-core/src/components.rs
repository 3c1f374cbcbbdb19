//! ECS components for hecs entities.
//!
//! Components are plain data structs. Behaviour lives in the response
//! crate and the engine's systems, not here.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::enums::{EscapeStrategy, Guild};
use crate::types::{AgentId, SpeciesId};

/// Who an agent is. Fixed at spawn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Identity {
    pub id: AgentId,
    pub species: SpeciesId,
    pub guild: Guild,
}

/// Where an agent is and where it is looking.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Kinematics {
    pub position: DVec3,
    pub velocity: DVec3,
    /// Look direction (not necessarily normalized).
    pub facing: DVec3,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Vitals {
    pub health: f64,
    pub max_health: f64,
    pub juvenile: bool,
    /// Tick of the most recent damage taken.
    pub last_damaged_tick: Option<u64>,
}

impl Default for Vitals {
    fn default() -> Self {
        Self {
            health: 10.0,
            max_health: 10.0,
            juvenile: false,
            last_damaged_tick: None,
        }
    }
}

/// Host-controlled behaviour flags read by the threat classifier.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Disposition {
    pub aggressive: bool,
    pub stealthy: bool,
}

/// Movement limits handed to the locomotion executor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Locomotion {
    /// Maximum speed (units per tick).
    pub max_speed: f64,
    /// Maximum change in velocity per tick.
    pub max_force: f64,
}

impl Default for Locomotion {
    fn default() -> Self {
        Self {
            max_speed: 0.4,
            max_force: 0.1,
        }
    }
}

/// Last steering intent produced for this agent.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SteeringIntent(pub DVec3);

/// Per-agent escape state machine data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscapeState {
    pub strategy: EscapeStrategy,
    /// Ticks spent zigzagging; drives the sinusoid phase.
    pub zigzag_timer: u32,
    /// Perpendicular side, +1.0 or -1.0.
    pub zigzag_direction: f64,
    /// Last redrawn intensity. `None` until the first redraw.
    pub zigzag_intensity: Option<f64>,
    /// Remaining freeze ticks. Zero when not frozen.
    pub freeze_timer: u32,
    pub cached_refuge: Option<DVec3>,
    /// Tick of the last refuge lookup, whether or not it found one.
    pub refuge_cached_at: Option<u64>,
    /// 0.0..=1.0
    pub habituation_level: f64,
    pub last_threat: Option<AgentId>,
    pub last_threat_tick: Option<u64>,
    /// Tick the current flee episode started.
    pub flee_started_tick: Option<u64>,
    /// Whether the agent took damage during the current flee episode.
    pub injured_while_fleeing: bool,
    /// Tick the last uninjured flee episode ended, pending recovery.
    pub recovery_since: Option<u64>,
}

impl Default for EscapeState {
    fn default() -> Self {
        Self {
            strategy: EscapeStrategy::Straight,
            zigzag_timer: 0,
            zigzag_direction: 1.0,
            zigzag_intensity: None,
            freeze_timer: 0,
            cached_refuge: None,
            refuge_cached_at: None,
            habituation_level: 0.0,
            last_threat: None,
            last_threat_tick: None,
            flee_started_tick: None,
            injured_while_fleeing: false,
            recovery_since: None,
        }
    }
}

impl EscapeState {
    pub fn is_frozen(&self) -> bool {
        self.strategy == EscapeStrategy::Freeze && self.freeze_timer > 0
    }
}

/// Per-agent panic state. The `is_panicking` and `is_fleeing` flags are
/// visible to other agents through their start-of-step views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanicState {
    pub is_panicking: bool,
    pub is_fleeing: bool,
    /// Inbox: a neighbour broadcast panic or an alarm alerted this agent
    /// since its last evaluation.
    pub signalled: bool,
    /// Where the signal said the threat was.
    pub signal_source: Option<DVec3>,
    /// Remaining stampede ticks.
    pub timer: u32,
    /// Ticks before panic may retrigger.
    pub cooldown: u32,
    pub threat_count: u32,
    /// 0.0..=1.0
    pub intensity: f64,
    /// Cached flight direction. Zero when unset.
    pub stampede_direction: DVec3,
    pub primary_threat: Option<AgentId>,
    pub triggered_at: Option<u64>,
}

impl Default for PanicState {
    fn default() -> Self {
        Self {
            is_panicking: false,
            is_fleeing: false,
            signalled: false,
            signal_source: None,
            timer: 0,
            cooldown: 0,
            threat_count: 0,
            intensity: 0.0,
            stampede_direction: DVec3::ZERO,
            primary_threat: None,
            triggered_at: None,
        }
    }
}

/// Per-agent alarm-call state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlarmState {
    /// Remaining cooldown ticks.
    pub cooldown: u32,
    pub last_alarm_tick: Option<u64>,
    pub last_threat: Option<AgentId>,
    pub total_alarms: u32,
    /// Total listeners alerted across all alarms.
    pub herd_alerted: u32,
}
